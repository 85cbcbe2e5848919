//! Process-backed runtime adapters for groktest.
//!
//! Each adapter implements [`groktest_core::Runtime`]: the Python runtime
//! keeps one persistent interpreter per document and speaks line-framed
//! JSON with it; the shell runtime runs one `sh` process per test with
//! explicit state carry-over.

#![deny(clippy::all)]

mod error;
mod proc;
mod proto;
mod python;
mod shell;

pub use error::RuntimeError;
pub use python::PythonRuntime;
pub use shell::ShellRuntime;

use groktest_core::error::Error;
use groktest_core::error::Result;
use groktest_core::runtime::Runtime;

/// Instantiates the adapter registered for a test type's runtime key.
pub fn runtime_for_key(key: &str) -> Result<Box<dyn Runtime>> {
    match key {
        "python" => Ok(Box::new(PythonRuntime::new())),
        "shell" => Ok(Box::new(ShellRuntime::new())),
        other => Err(Error::RuntimeNotSupported(other.to_string())),
    }
}
