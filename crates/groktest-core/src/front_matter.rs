//! Front-matter extraction and decoding.
//!
//! Front matter is the content between a leading `---` line at the very top
//! of a document (optionally after a single blank line) and the next `---`
//! line. The inner text is decoded as JSON, then TOML, then a simplified
//! `key: value` dialect; the first decoder producing a mapping wins.

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::value::coerce_scalar;
use crate::value::toml_to_json;

/// Synthetic key naming the file a mapping was read from.
pub const SRC_KEY: &str = "__src__";

#[derive(Debug, Clone)]
pub struct FrontMatter {
    pub config: Map<String, Value>,
    /// Document lines consumed by the front-matter block, fences included.
    pub lines: usize,
}

/// Parses front matter from document content.
///
/// Always returns a mapping carrying [`SRC_KEY`]; a missing or malformed
/// block yields an otherwise empty mapping.
pub fn parse_front_matter(content: &str, filename: &str) -> FrontMatter {
    let Some((inner, lines)) = extract_block(content) else {
        return FrontMatter {
            config: src_only(filename),
            lines: 0,
        };
    };
    let mut config = match decode(&inner, filename) {
        Some(config) => config,
        None => {
            eprintln!("WARNING: malformed front matter in {filename}, ignoring");
            src_only(filename)
        }
    };
    config.insert(SRC_KEY.to_string(), Value::String(filename.to_string()));
    FrontMatter { config, lines }
}

fn src_only(filename: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(SRC_KEY.to_string(), Value::String(filename.to_string()));
    map
}

/// Locates the fenced block, returning its inner text and the total line
/// count consumed (leading blank line and both fences included).
fn extract_block(content: &str) -> Option<(String, usize)> {
    let mut lines = content.lines();
    let mut consumed = 0;
    let mut first = lines.next()?;
    if first.trim().is_empty() {
        first = lines.next()?;
        consumed += 1;
    }
    if first.trim_end() != "---" {
        return None;
    }
    consumed += 1;
    let mut inner = Vec::new();
    for line in lines {
        consumed += 1;
        if line.trim_end() == "---" {
            return Some((inner.join("\n"), consumed));
        }
        inner.push(line);
    }
    None
}

fn decode(inner: &str, filename: &str) -> Option<Map<String, Value>> {
    try_json(inner, filename)
        .or_else(|| try_toml(inner, filename))
        .or_else(|| try_simplified(inner, filename))
}

fn try_json(s: &str, filename: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => {
            debug!("parsed JSON front matter for {filename}");
            Some(map)
        }
        Ok(other) => {
            warn!("unexpected JSON front matter type in {filename}: {other}");
            None
        }
        Err(err) => {
            debug!("error parsing JSON front matter for {filename}: {err}");
            None
        }
    }
}

fn try_toml(s: &str, filename: &str) -> Option<Map<String, Value>> {
    match s.parse::<toml::Value>() {
        Ok(value) => match toml_to_json(value) {
            Value::Object(map) => {
                debug!("parsed TOML front matter for {filename}");
                Some(map)
            }
            other => {
                warn!("unexpected TOML front matter type in {filename}: {other}");
                None
            }
        },
        Err(err) => {
            debug!("error parsing TOML front matter for {filename}: {err}");
            None
        }
    }
}

/// The simplified dialect: one `key: value` or `key = value` per line.
/// Lines starting with `#` are comments. A `#` inside a value is part of
/// the value.
fn try_simplified(s: &str, filename: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for line in s.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (key, value) = split_key_value(trimmed)?;
        map.insert(key.to_string(), coerce_scalar(value));
    }
    debug!("parsed simplified front matter for {filename}");
    Some(map)
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let sep = line.find([':', '='])?;
    let key = line[..sep].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[sep + 1..].trim()))
}
