//! Scriptable runtime for runner tests.
//!
//! `MockRuntime` replays canned outputs keyed by expression text and
//! records every call made to it, so runner behavior can be asserted
//! without a subordinate process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;
use crate::extract::Test;
use crate::runtime::Runtime;
use crate::runtime::TestOutput;

#[derive(Debug, Clone, Default)]
pub struct MockCalls {
    pub started: u32,
    pub stopped: u32,
    pub initialized: u32,
    pub executed: Vec<String>,
    pub bound_vars: Vec<Map<String, Value>>,
}

#[derive(Clone, Default)]
pub struct MockRuntime {
    outputs: HashMap<String, TestOutput>,
    default_output: Option<TestOutput>,
    fail_start: bool,
    available: bool,
    calls: Arc<Mutex<MockCalls>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        MockRuntime::default()
    }

    /// Canned output for a specific expression.
    pub fn set_output(&mut self, expr: &str, output: TestOutput) {
        self.outputs.insert(expr.to_string(), output);
    }

    /// Fallback output for expressions without a canned entry. Without
    /// one, unexpected expressions are an error.
    pub fn set_default_output(&mut self, output: TestOutput) {
        self.default_output = Some(output);
    }

    pub fn fail_start(&mut self) {
        self.fail_start = true;
    }

    /// Shared handle to the recorded calls, valid after the runtime is
    /// consumed by a run.
    pub fn calls(&self) -> Arc<Mutex<MockCalls>> {
        self.calls.clone()
    }
}

impl Runtime for MockRuntime {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(Error::Runtime("mock start failure".to_string()));
        }
        self.calls.lock().unwrap().started += 1;
        self.available = true;
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn init_for_tests(&mut self, _config: &Map<String, Value>) -> Result<()> {
        self.calls.lock().unwrap().initialized += 1;
        Ok(())
    }

    fn exec_test_expr(&mut self, test: &Test, _options: &Map<String, Value>) -> Result<TestOutput> {
        self.calls.lock().unwrap().executed.push(test.expr.clone());
        if let Some(output) = self.outputs.get(&test.expr) {
            return Ok(output.clone());
        }
        match &self.default_output {
            Some(output) => Ok(output.clone()),
            None => Err(Error::Runtime(format!(
                "no canned output for expression {:?}",
                test.expr
            ))),
        }
    }

    fn handle_test_match(&mut self, vars: &Map<String, Value>) -> Result<()> {
        self.calls.lock().unwrap().bound_vars.push(vars.clone());
        Ok(())
    }

    fn stop(&mut self) {
        if self.available {
            self.calls.lock().unwrap().stopped += 1;
            self.available = false;
        }
    }
}
