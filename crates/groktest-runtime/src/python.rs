//! The Python runtime adapter.
//!
//! Owns a persistent `python3` process running the embedded driver loop
//! and speaks the line-framed JSON protocol with it. One instance serves
//! one document; expressions share the interpreter's global scope, so
//! bindings from parse matches are visible to later tests.

use std::env;
use std::process::Command;
use std::time::Duration;

use serde_json::Map;
use serde_json::Value;
use tracing::warn;

use groktest_core::coerce_list;
use groktest_core::error::Result;
use groktest_core::extract::Test;
use groktest_core::runtime::Runtime;
use groktest_core::runtime::TestOutput;

use crate::error::RuntimeError;
use crate::proc::ProcHandle;
use crate::proto::Request;
use crate::proto::Response;

const DRIVER_SOURCE: &str = include_str!("python_driver.py");
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct PythonRuntime {
    proc: Option<ProcHandle>,
}

impl PythonRuntime {
    pub fn new() -> Self {
        PythonRuntime::default()
    }

    fn proc(&mut self) -> std::result::Result<&mut ProcHandle, RuntimeError> {
        self.proc.as_mut().ok_or(RuntimeError::NotRunning)
    }

    fn roundtrip(&mut self, request: &Request<'_>) -> std::result::Result<Response, RuntimeError> {
        let line = request.encode()?;
        let proc = self.proc()?;
        proc.send_line(&line)?;
        Response::decode(&proc.recv_line()?)
    }
}

fn python_command() -> Command {
    let program = env::var("GROKTEST_PYTHON").unwrap_or_else(|_| "python3".to_string());
    let mut command = Command::new(program);
    command.arg("-c").arg(DRIVER_SOURCE);
    command
}

/// The `python.init` config entry: a preamble string or list of lines.
fn init_expr(config: &Map<String, Value>) -> Option<String> {
    let value = config.get("python")?.get("init")?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(_) => Some(
            coerce_list(value)
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => {
            warn!("python init must be a string or list of strings, got {other}");
            None
        }
    }
}

impl Runtime for PythonRuntime {
    fn start(&mut self) -> Result<()> {
        let proc = ProcHandle::spawn(&mut python_command())?;
        self.proc = Some(proc);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.proc.is_some()
    }

    fn init_for_tests(&mut self, config: &Map<String, Value>) -> Result<()> {
        let Some(expr) = init_expr(config) else {
            return Ok(());
        };
        self.roundtrip(&Request::Init { expr: &expr })?
            .expect_ack()?;
        Ok(())
    }

    fn exec_test_expr(&mut self, test: &Test, options: &Map<String, Value>) -> Result<TestOutput> {
        let result = self
            .roundtrip(&Request::Test {
                expr: &test.expr,
                filename: &test.filename,
                line: test.line,
                options,
            })?
            .expect_result()?;
        Ok(TestOutput {
            code: result.code,
            output: result.output,
            short_error: result.short_error,
        })
    }

    fn handle_test_match(&mut self, vars: &Map<String, Value>) -> Result<()> {
        self.roundtrip(&Request::Vars { vars })?.expect_ack()?;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(proc) = self.proc.take() {
            proc.stop(STOP_GRACE);
        }
    }
}

impl Drop for PythonRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
