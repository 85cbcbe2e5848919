//! Project and test-file discovery.
//!
//! A positional argument that is (or contains) a TOML file with a
//! `[tool.groktest]` table selects project mode; the project's `include`
//! and `exclude` globs then name the suite. Otherwise positionals are
//! taken as test files directly.

use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use groktest_core::coerce_list;
use groktest_core::front_matter::SRC_KEY;

const PROJECT_FILE_CANDIDATES: &[&str] = &["groktest.toml", "pyproject.toml", "Cargo.toml"];

/// The TOML file named by a project path argument, if any.
pub fn project_candidate(path_arg: &str) -> Option<PathBuf> {
    let arg = PathBuf::from(path_arg);
    let mut candidates = vec![arg.clone()];
    for name in PROJECT_FILE_CANDIDATES {
        candidates.push(arg.join(name));
    }
    candidates.into_iter().find(|path| {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml")) && path.is_file()
    })
}

/// Expands a project config's `include`/`exclude` globs into test
/// filenames, relative to the project file's directory.
pub fn suite_filenames(config: &Map<String, Value>) -> anyhow::Result<Vec<PathBuf>> {
    let Some(src) = config.get(SRC_KEY).and_then(Value::as_str) else {
        return Ok(vec![]);
    };
    let include = config.get("include").map(coerce_list).unwrap_or_default();
    if include.is_empty() {
        bail!("Missing 'include' in 'tool.groktest' section in {src}");
    }
    let basepath = Path::new(src).parent().unwrap_or(Path::new("."));
    let exclude = config.get("exclude").map(coerce_list).unwrap_or_default();
    let excluded = apply_patterns(&exclude, basepath, "exclude")?;
    let included = apply_patterns(&include, basepath, "include")?;
    Ok(included
        .into_iter()
        .filter(|path| !excluded.contains(path))
        .collect())
}

fn apply_patterns(
    patterns: &[Value],
    basepath: &Path,
    desc: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut filenames = Vec::new();
    for pattern in patterns {
        let Some(pattern) = pattern.as_str() else {
            bail!("Invalid {desc} pattern {pattern}: expected string");
        };
        let full = basepath.join(pattern);
        let matches: Vec<PathBuf> = glob::glob(&full.to_string_lossy())?
            .filter_map(std::result::Result::ok)
            .collect();
        debug!("tests for {desc} pattern '{pattern}': {matches:?}");
        filenames.extend(matches);
    }
    Ok(filenames)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map_of(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_project_candidate_direct_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(
            project_candidate(&path.to_string_lossy()),
            Some(path.clone())
        );
    }

    #[test]
    fn test_project_candidate_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(
            project_candidate(&dir.path().to_string_lossy()),
            Some(path)
        );
    }

    #[test]
    fn test_project_candidate_none_for_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.md");
        std::fs::write(&doc, "").unwrap();
        assert_eq!(project_candidate(&doc.to_string_lossy()), None);
    }

    #[test]
    fn test_suite_filenames_include_exclude() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        for name in ["a.md", "b.md", "skip.md"] {
            std::fs::write(docs.join(name), "").unwrap();
        }
        let config = map_of(json!({
            SRC_KEY: dir.path().join("pyproject.toml").to_string_lossy(),
            "include": "docs/*.md",
            "exclude": ["docs/skip.md"]
        }));
        let mut files = suite_filenames(&config).unwrap();
        files.sort();
        assert_eq!(files, vec![docs.join("a.md"), docs.join("b.md")]);
    }

    #[test]
    fn test_suite_filenames_missing_include() {
        let config = map_of(json!({SRC_KEY: "/tmp/pyproject.toml"}));
        let err = suite_filenames(&config).unwrap_err();
        assert!(err.to_string().contains("Missing 'include'"));
    }

    #[test]
    fn test_suite_filenames_without_src() {
        assert!(suite_filenames(&Map::new()).unwrap().is_empty());
    }
}
