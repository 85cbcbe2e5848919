//! Config resolution.
//!
//! Three sources merge into one effective config per document, in
//! increasing precedence: a project file discovered above the document,
//! CLI-synthesized entries, and the document's front matter. Mappings merge
//! key-wise; higher-precedence scalars replace lower ones.

use std::fs;
use std::path::Path;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::front_matter::SRC_KEY;
use crate::value::deep_merge;
use crate::value::toml_to_json;

/// Project files searched for a `[tool.groktest]` table, in order.
pub const PROJECT_FILE_NAMES: &[&str] = &["groktest.toml", "pyproject.toml"];

/// Front-matter keys lifted into canonical nested config paths. Keys
/// already nested under the canonical root pass through untouched.
const FRONT_MATTER_ALIASES: &[(&str, &[&str])] = &[
    ("test-options", &["options"]),
    ("parse-types", &["parse", "types"]),
    ("python-init", &["python", "init"]),
    ("shell-init", &["shell", "init"]),
    ("option-functions", &["option", "functions"]),
];

/// Loads the `[tool.groktest]` table from a project file.
///
/// Returns `Ok(None)` when the file has no groktest section.
pub fn load_project_config(path: &Path) -> Result<Option<Map<String, Value>>> {
    let contents = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = contents.parse().map_err(|err: toml::de::Error| {
        Error::ProjectDecode {
            path: path.to_path_buf(),
            reason: err.message().to_string(),
        }
    })?;
    let Value::Object(data) = toml_to_json(value) else {
        return Ok(None);
    };
    let Some(section) = data
        .get("tool")
        .and_then(|tool| tool.get("groktest"))
        .and_then(Value::as_object)
    else {
        return Ok(None);
    };
    let mut config = section.clone();
    config.insert(
        SRC_KEY.to_string(),
        Value::String(path.display().to_string()),
    );
    debug!("using project config in {}", path.display());
    Ok(Some(config))
}

/// Walks upward from a document looking for a project file with a
/// groktest section. Decode errors are reported and end the search.
pub fn find_project_config(doc_path: &Path) -> Option<Map<String, Value>> {
    for dir in doc_path.ancestors().skip(1) {
        for name in PROJECT_FILE_NAMES {
            let candidate = dir.join(name);
            if !candidate.is_file() {
                continue;
            }
            match load_project_config(&candidate) {
                Ok(Some(config)) => return Some(config),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        "Error loading project config from {}: {err}",
                        candidate.display()
                    );
                    return None;
                }
            }
        }
    }
    None
}

/// Lifts friendly top-level front-matter keys into canonical nested
/// paths. A document that nests config under `tool.groktest` passes that
/// table through unchanged.
pub fn normalize_front_matter(fm: &Map<String, Value>) -> Map<String, Value> {
    if let Some(section) = fm
        .get("tool")
        .and_then(|tool| tool.get("groktest"))
        .and_then(Value::as_object)
    {
        return section.clone();
    }
    let mut normalized = Map::new();
    for (key, value) in fm {
        match FRONT_MATTER_ALIASES.iter().find(|(alias, _)| alias == key) {
            Some((_, path)) => insert_nested(&mut normalized, path, value.clone()),
            None => {
                normalized.insert(key.clone(), value.clone());
            }
        }
    }
    normalized
}

fn insert_nested(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    let (first, rest) = path.split_first().expect("alias path must be non-empty");
    if rest.is_empty() {
        map.insert(first.to_string(), value);
        return;
    }
    let entry = map
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match entry {
        Value::Object(nested) => insert_nested(nested, rest, value),
        other => {
            let mut nested = Map::new();
            insert_nested(&mut nested, rest, value);
            *other = Value::Object(nested);
        }
    }
}

/// Merges project config, CLI-synthesized config, and front matter into
/// one effective config, in that order of increasing precedence.
pub fn resolve_test_config(
    front_matter: &Map<String, Value>,
    project_config: Option<&Map<String, Value>>,
    cli_config: &Map<String, Value>,
) -> Map<String, Value> {
    let mut resolved = Map::new();
    if let Some(project) = project_config {
        deep_merge(&mut resolved, project);
    }
    deep_merge(&mut resolved, cli_config);
    deep_merge(&mut resolved, &normalize_front_matter(front_matter));
    resolved
}

/// The document's declared test type, from `type` (project/nested form)
/// or `test-type` (front-matter form).
pub fn test_type(config: &Map<String, Value>) -> Option<&str> {
    config
        .get("type")
        .or_else(|| config.get("test-type"))
        .and_then(Value::as_str)
}

/// Custom parse types registered under `parse.types`.
pub fn parse_types(config: &Map<String, Value>) -> Map<String, Value> {
    config
        .get("parse")
        .and_then(|parse| parse.get("types"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

pub fn config_bool(config: &Map<String, Value>, key: &str) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub fn config_int(config: &Map<String, Value>, key: &str) -> Option<i64> {
    config.get(key).and_then(Value::as_i64)
}
