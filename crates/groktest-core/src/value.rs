//! Conversions between config surface syntax and JSON values.
//!
//! All configuration in groktest flows through `serde_json` values so front
//! matter, project files, and inline options merge uniformly.

use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

/// Coerces a scalar token using the simplified front-matter rules.
///
/// Quoted strings are unwrapped verbatim; `true/yes/on` and `false/no/off`
/// become booleans; integer and float literals become numbers; anything else
/// stays a string.
pub fn coerce_scalar(s: &str) -> Value {
    if s.len() >= 2 {
        let first = s.chars().next();
        let last = s.chars().last();
        if (first == Some('"') && last == Some('"')) || (first == Some('\'') && last == Some('\''))
        {
            return Value::String(s[1..s.len() - 1].to_string());
        }
    }
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => return Value::Bool(true),
        "false" | "no" | "off" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(s.to_string())
}

/// Converts a parsed TOML value into a JSON value.
///
/// Datetimes have no JSON counterpart and are carried as their literal
/// string form.
pub fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(n) => Value::Number(n.into()),
        toml::Value::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, val)| (key, toml_to_json(val)))
                .collect(),
        ),
    }
}

/// Merges `src` into `dest`: mappings merge key-wise, any other value from
/// `src` replaces the value in `dest`.
pub fn deep_merge(dest: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, src_val) in src {
        match (dest.get_mut(key), src_val) {
            (Some(Value::Object(dest_map)), Value::Object(src_map)) => {
                deep_merge(dest_map, src_map);
            }
            _ => {
                dest.insert(key.clone(), src_val.clone());
            }
        }
    }
}

/// Coerces a config value to a list, wrapping scalars and dropping nulls.
pub fn coerce_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => vec![],
        other => vec![other.clone()],
    }
}
