//! Core errors surfaced while planning and running test documents.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Test type '{0}' is not supported")]
    TestTypeNotSupported(String),
    #[error("Runtime '{0}' is not supported")]
    RuntimeNotSupported(String),
    #[error("Error loading project config from {path}: {reason}")]
    ProjectDecode { path: PathBuf, reason: String },
    #[error("File \"{filename}\", line {line}, in test: {reason}")]
    TestParse {
        filename: String,
        line: usize,
        reason: String,
    },
    #[error("Error in expected output pattern: {0}")]
    ExpectedPattern(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Interrupted")]
    Interrupted,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn test_parse(filename: &str, line: usize, reason: &str) -> Self {
        Error::TestParse {
            filename: filename.to_string(),
            line,
            reason: reason.to_string(),
        }
    }

    /// True for errors that skip a document without failing the session.
    pub fn is_document_skip(&self) -> bool {
        matches!(self, Error::TestTypeNotSupported(_) | Error::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_parse_display() {
        let err = Error::test_parse("x.md", 3, "space missing after prompt");
        assert_eq!(
            err.to_string(),
            "File \"x.md\", line 3, in test: space missing after prompt"
        );
    }

    #[test]
    fn test_document_skip_classification() {
        assert!(Error::TestTypeNotSupported("rust".into()).is_document_skip());
        assert!(!Error::RuntimeNotSupported("rust".into()).is_document_skip());
        assert!(!Error::Interrupted.is_document_skip());
    }
}
