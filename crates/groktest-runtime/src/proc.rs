//! Line-framed child process plumbing.
//!
//! A `ProcHandle` owns a spawned interpreter with piped stdin/stdout and
//! exchanges newline-delimited frames with it. Reads block until the child
//! writes a full line; the adapter presents a synchronous interface to the
//! core.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::process::Child;
use std::process::ChildStdin;
use std::process::ChildStdout;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::warn;

use crate::error::RuntimeError;

#[derive(Debug)]
pub struct ProcHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcHandle {
    pub fn spawn(command: &mut Command) -> Result<Self, RuntimeError> {
        let program = command.get_program().to_string_lossy().to_string();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| RuntimeError::Spawn {
                command: program.clone(),
                reason: err.to_string(),
            })?;
        let stdin = child.stdin.take().ok_or_else(|| RuntimeError::Spawn {
            command: program.clone(),
            reason: "stdin not piped".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| RuntimeError::Spawn {
            command: program.clone(),
            reason: "stdout not piped".to_string(),
        })?;
        debug!("spawned runtime process {program} (pid {})", child.id());
        Ok(ProcHandle {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    pub fn send_line(&mut self, line: &str) -> Result<(), RuntimeError> {
        writeln!(self.stdin, "{line}").map_err(|err| RuntimeError::Write(err.to_string()))?;
        self.stdin
            .flush()
            .map_err(|err| RuntimeError::Write(err.to_string()))
    }

    /// Reads one response frame. EOF means the child exited underneath us.
    pub fn recv_line(&mut self) -> Result<String, RuntimeError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|err| RuntimeError::Read(err.to_string()))?;
        if read == 0 {
            return Err(RuntimeError::Read(
                "runtime process closed its output".to_string(),
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Asks the child to exit by sending an empty frame, waits up to
    /// `grace`, then kills it.
    pub fn stop(mut self, grace: Duration) {
        let _ = self.stdin.write_all(b"\n");
        let _ = self.stdin.flush();
        drop(self.stdin);
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!("runtime process exited: {status}");
                    return;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("runtime process did not exit, killing");
                        let _ = self.child.kill();
                        let _ = self.child.wait();
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(err) => {
                    warn!("error waiting for runtime process: {err}");
                    let _ = self.child.kill();
                    return;
                }
            }
        }
    }
}
