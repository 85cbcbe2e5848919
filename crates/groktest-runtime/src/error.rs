//! Runtime adapter errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to spawn {command}: {reason}")]
    Spawn { command: String, reason: String },
    #[error("Failed to write to runtime: {0}")]
    Write(String),
    #[error("Failed to read from runtime: {0}")]
    Read(String),
    #[error("Invalid runtime response: {0}")]
    Decode(String),
    #[error("Runtime not started")]
    NotRunning,
}

impl From<RuntimeError> for groktest_core::Error {
    fn from(err: RuntimeError) -> Self {
        groktest_core::Error::Runtime(err.to_string())
    }
}
