//! Inline test options and their resolution.
//!
//! Options appear as `+name`, `-name`, or `+name=value` tokens in a test's
//! trailing comment, in a document's `test-options` front matter, or in
//! project config. Effective options overlay spec defaults with document
//! options and then per-test inline options; the last occurrence of a name
//! wins.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Map;
use serde_json::Value;
use tracing::warn;

use crate::extract::Test;
use crate::spec::TestSpec;
use crate::value::coerce_list;
use crate::value::coerce_scalar;

fn options_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\+([\w-]+)(?:\s*=\s*('.*?'|".*?"|\S+))?|-([\w-]+)"#)
            .expect("options pattern must compile")
    })
}

fn comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|\s)#(.*)$").expect("comment pattern must compile"))
}

/// Decodes an option string into a name/value mapping.
///
/// Tokens that match no rule are ignored. Unbalanced quotes degrade to the
/// raw whitespace-delimited token, stray quote included.
pub fn decode_options(s: &str) -> Map<String, Value> {
    let mut options = Map::new();
    for caps in options_pattern().captures_iter(s) {
        if let Some(name) = caps.get(3) {
            options.insert(name.as_str().to_string(), Value::Bool(false));
        } else if let Some(name) = caps.get(1) {
            let value = match caps.get(2) {
                Some(val) => coerce_scalar(val.as_str()),
                None => Value::Bool(true),
            };
            options.insert(name.as_str().to_string(), value);
        }
    }
    options
}

/// Re-serializes a decoded option map. Decoding the result yields the same
/// map, which keeps option handling round-trippable.
pub fn encode_options(options: &Map<String, Value>) -> String {
    let mut parts = Vec::with_capacity(options.len());
    for (name, value) in options {
        match value {
            Value::Bool(true) => parts.push(format!("+{name}")),
            Value::Bool(false) => parts.push(format!("-{name}")),
            Value::Number(n) => parts.push(format!("+{name}={n}")),
            Value::String(s) => parts.push(format!("+{name}='{s}'")),
            other => parts.push(format!("+{name}='{other}'")),
        }
    }
    parts.join(" ")
}

/// Decodes inline options from the trailing comment of an expression's
/// first line.
pub fn decode_expr_options(expr: &str) -> Map<String, Value> {
    let first_line = expr.lines().next().unwrap_or("");
    match comment_pattern().captures(first_line) {
        Some(caps) => decode_options(&caps[1]),
        None => Map::new(),
    }
}

/// Decodes the `options` entry of a resolved config, which may be a single
/// option string or a list of them.
pub fn decode_config_options(config: &Map<String, Value>, filename: &str) -> Map<String, Value> {
    let mut decoded = Map::new();
    let Some(value) = config.get("options") else {
        return decoded;
    };
    for part in coerce_list(value) {
        match part {
            Value::String(s) => decoded.append(&mut decode_options(&s)),
            other => warn!("Invalid option {other} in {filename}: expected string"),
        }
    }
    decoded
}

/// Computes the effective options for one test: spec defaults, then
/// document options, then inline options. A bare `+wildcard` resolves to
/// the spec's wildcard token.
pub fn effective_options(
    test: &Test,
    config: &Map<String, Value>,
    spec: &TestSpec,
) -> Map<String, Value> {
    let mut options = spec.default_options();
    for (name, value) in decode_config_options(config, &test.filename) {
        options.insert(name, value);
    }
    for (name, value) in &test.options {
        options.insert(name.clone(), value.clone());
    }
    if options.get("wildcard") == Some(&Value::Bool(true)) {
        options.insert(
            "wildcard".to_string(),
            Value::String(spec.wildcard_token.to_string()),
        );
    }
    options
}

/// Truthiness of an option value: absent or null falls back to `default`;
/// strings are true when non-empty; numbers when nonzero.
pub fn is_enabled(options: &Map<String, Value>, name: &str, default: bool) -> bool {
    match options.get(name) {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

pub fn opt_str<'a>(options: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    options.get(name).and_then(Value::as_str)
}

pub fn opt_int(options: &Map<String, Value>, name: &str) -> Option<i64> {
    options.get(name).and_then(Value::as_i64)
}
