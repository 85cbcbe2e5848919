//! Wire protocol between the core and a subordinate interpreter.
//!
//! Requests and responses are newline-delimited JSON over the child's
//! stdin/stdout. Output with embedded newlines survives because it travels
//! as a JSON string within one frame.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::RuntimeError;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request<'a> {
    Init {
        expr: &'a str,
    },
    Test {
        expr: &'a str,
        filename: &'a str,
        line: usize,
        options: &'a Map<String, Value>,
    },
    Vars {
        vars: &'a Map<String, Value>,
    },
}

impl Request<'_> {
    pub fn encode(&self) -> Result<String, RuntimeError> {
        serde_json::to_string(self).map_err(|err| RuntimeError::Write(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Acknowledgment of an init or vars request.
    Ack(String),
    Result(TestResultMsg),
}

#[derive(Debug, Deserialize)]
pub struct TestResultMsg {
    pub code: i32,
    pub output: String,
    #[serde(rename = "short-error", default)]
    pub short_error: Option<String>,
}

impl Response {
    pub fn decode(line: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(line).map_err(|err| RuntimeError::Decode(err.to_string()))
    }

    pub fn expect_ack(self) -> Result<(), RuntimeError> {
        match self {
            Response::Ack(ack) if ack == "ack" => Ok(()),
            other => Err(RuntimeError::Decode(format!(
                "expected ack, got {other:?}"
            ))),
        }
    }

    pub fn expect_result(self) -> Result<TestResultMsg, RuntimeError> {
        match self {
            Response::Result(result) => Ok(result),
            other => Err(RuntimeError::Decode(format!(
                "expected test result, got {other:?}"
            ))),
        }
    }
}
