//! Built-in test-type profiles.
//!
//! A profile defines how example blocks look in a document (prompt strings),
//! which runtime executes them, and the per-type matching defaults.

use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct TestSpec {
    pub name: &'static str,
    pub runtime_key: &'static str,
    /// Primary prompt marking the first line of an expression.
    pub ps1: &'static str,
    /// Continuation prompt; absent for test types without multi-line
    /// expressions.
    pub ps2: Option<&'static str>,
    /// Literal token standing in for an empty line in expected output.
    pub blankline_marker: &'static str,
    /// Token substituted when the `wildcard` option is enabled without a
    /// value.
    pub wildcard_token: &'static str,
    default_options: &'static [(&'static str, DefaultValue)],
}

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Bool(bool),
}

impl TestSpec {
    /// Option defaults this test type applies beneath document and inline
    /// options.
    pub fn default_options(&self) -> Map<String, Value> {
        self.default_options
            .iter()
            .map(|(name, val)| {
                let value = match val {
                    DefaultValue::Bool(b) => Value::Bool(*b),
                };
                (name.to_string(), value)
            })
            .collect()
    }
}

pub const PYTHON_SPEC: TestSpec = TestSpec {
    name: "python",
    runtime_key: "python",
    ps1: ">>>",
    ps2: Some("..."),
    blankline_marker: "\u{2936}", // ⤶
    wildcard_token: "...",
    default_options: &[],
};

pub const SHELL_SPEC: TestSpec = TestSpec {
    name: "shell",
    runtime_key: "shell",
    ps1: ">",
    ps2: None,
    blankline_marker: "\u{2936}",
    wildcard_token: "...",
    // Command output conventionally interleaves stderr.
    default_options: &[("stderr", DefaultValue::Bool(true))],
};

pub const DEFAULT_SPEC: &TestSpec = &PYTHON_SPEC;

pub fn spec_for_type(test_type: &str) -> Result<&'static TestSpec> {
    match test_type {
        "python" => Ok(&PYTHON_SPEC),
        "shell" => Ok(&SHELL_SPEC),
        other => Err(Error::TestTypeNotSupported(other.to_string())),
    }
}
