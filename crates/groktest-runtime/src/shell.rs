//! The shell runtime adapter.
//!
//! Shell tests run one `sh -c` process per expression with the document's
//! directory as working directory. State across tests is carried
//! explicitly: bound variables are exported into each command's
//! environment, and a `shell.init` prelude is prepended to every
//! expression.

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use groktest_core::coerce_list;
use groktest_core::error::Result;
use groktest_core::extract::Test;
use groktest_core::options::is_enabled;
use groktest_core::runtime::Runtime;
use groktest_core::runtime::TestOutput;

use crate::error::RuntimeError;

#[derive(Default)]
pub struct ShellRuntime {
    state: Option<ShellState>,
}

#[derive(Default)]
struct ShellState {
    vars: Map<String, Value>,
    init: Option<String>,
    test_dir: Option<PathBuf>,
}

impl ShellRuntime {
    pub fn new() -> Self {
        ShellRuntime::default()
    }
}

fn shell_program() -> String {
    env::var("GROKTEST_SHELL").unwrap_or_else(|_| "sh".to_string())
}

fn init_script(config: &Map<String, Value>) -> Option<String> {
    let value = config.get("shell")?.get("init")?;
    let lines: Vec<String> = coerce_list(value)
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Environment form of a bound variable.
fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Runtime for ShellRuntime {
    fn start(&mut self) -> Result<()> {
        self.state = Some(ShellState::default());
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.state.is_some()
    }

    fn init_for_tests(&mut self, config: &Map<String, Value>) -> Result<()> {
        let state = self.state.as_mut().ok_or(RuntimeError::NotRunning)?;
        state.init = init_script(config);
        Ok(())
    }

    fn exec_test_expr(&mut self, test: &Test, options: &Map<String, Value>) -> Result<TestOutput> {
        let state = self.state.as_mut().ok_or(RuntimeError::NotRunning)?;
        if state.test_dir.is_none() {
            state.test_dir = Path::new(&test.filename)
                .parent()
                .map(Path::to_path_buf)
                .filter(|dir| dir.is_dir());
        }

        let mut script = String::new();
        if let Some(init) = &state.init {
            script.push_str(init);
            script.push('\n');
        }
        if is_enabled(options, "stderr", false) {
            // Group the expression so redirection covers all of it.
            script.push_str(&format!("{{ {}\n}} 2>&1\n", test.expr));
        } else {
            script.push_str(&test.expr);
            script.push('\n');
        }

        let mut command = Command::new(shell_program());
        command
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &state.test_dir {
            command.current_dir(dir);
        }
        for (name, value) in &state.vars {
            command.env(name, env_value(value));
        }
        let output = command.output().map_err(|err| RuntimeError::Spawn {
            command: shell_program(),
            reason: err.to_string(),
        })?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            debug!(
                "shell stderr for {}:{}: {}",
                test.filename,
                test.line,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        let code = if output.status.success() { 0 } else { 1 };
        let short_error = if code != 0 {
            text.lines().next().map(|line| format!("{line}\n"))
        } else {
            None
        };
        Ok(TestOutput {
            code,
            output: text,
            short_error,
        })
    }

    fn handle_test_match(&mut self, vars: &Map<String, Value>) -> Result<()> {
        let state = self.state.as_mut().ok_or(RuntimeError::NotRunning)?;
        for (name, value) in vars {
            state.vars.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.state = None;
    }
}
