//! The runtime adapter contract.
//!
//! The core drives a language runtime only through this trait. An adapter
//! owns a subordinate interpreter process: `start` spawns it,
//! `exec_test_expr` dispatches one expression and returns its captured
//! output, `handle_test_match` binds parse-match captures into the
//! interpreter's variable scope, and `stop` releases the process. All calls
//! are serialized; adapters need not be thread-safe.

use serde_json::Map;
use serde_json::Value;

use crate::error::Result;
use crate::extract::Test;

/// Captured result of evaluating one test expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutput {
    /// 0 when evaluation succeeded, 1 when the expression raised.
    pub code: i32,
    /// Output text; on error this carries the conventional error text the
    /// document compares against.
    pub output: String,
    /// Abbreviated error form (header plus final line of a traceback).
    pub short_error: Option<String>,
}

impl TestOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        TestOutput {
            code: 0,
            output: output.into(),
            short_error: None,
        }
    }

    pub fn error(output: impl Into<String>, short_error: Option<String>) -> Self {
        TestOutput {
            code: 1,
            output: output.into(),
            short_error,
        }
    }
}

pub trait Runtime {
    /// Spawns the underlying interpreter process.
    fn start(&mut self) -> Result<()>;

    /// True after a successful start, false after stop or spawn failure.
    fn is_available(&self) -> bool;

    /// Applies runtime-specific initialization from resolved config.
    /// Called once after `start` and before any test.
    fn init_for_tests(&mut self, config: &Map<String, Value>) -> Result<()>;

    /// Evaluates one test expression under the given effective options.
    fn exec_test_expr(&mut self, test: &Test, options: &Map<String, Value>) -> Result<TestOutput>;

    /// Binds named parse-match captures into the runtime's variable scope.
    fn handle_test_match(&mut self, vars: &Map<String, Value>) -> Result<()>;

    /// Releases the interpreter process. Idempotent.
    fn stop(&mut self);
}

/// Owns a runtime for the duration of a document run and guarantees
/// `stop` on every exit path.
pub struct RuntimeScope {
    runtime: Box<dyn Runtime>,
}

impl RuntimeScope {
    pub fn new(runtime: Box<dyn Runtime>) -> Self {
        RuntimeScope { runtime }
    }

    pub fn runtime(&mut self) -> &mut dyn Runtime {
        self.runtime.as_mut()
    }
}

impl Drop for RuntimeScope {
    fn drop(&mut self) {
        self.runtime.stop();
    }
}
