//! The last-session record.
//!
//! A JSON array of the most recent run's paths, kept in the system temp
//! directory. `--last` reads it; every other invocation rewrites it unless
//! `GROKTEST_NO_SAVE_LAST` is set. Writes go through a temp file and
//! rename so a concurrent reader never sees a partial record.

use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

pub const NO_SAVE_ENV_VAR: &str = "GROKTEST_NO_SAVE_LAST";

pub struct LastRunStore {
    path: PathBuf,
}

impl Default for LastRunStore {
    fn default() -> Self {
        LastRunStore {
            path: env::temp_dir().join("groktest.last"),
        }
    }
}

impl LastRunStore {
    pub fn new() -> Self {
        LastRunStore::default()
    }

    #[cfg(test)]
    fn at(path: PathBuf) -> Self {
        LastRunStore { path }
    }

    /// Paths from the previous session, or `None` when no session has
    /// been recorded.
    pub fn load(&self) -> anyhow::Result<Option<Vec<String>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading last session from {}", self.path.display()))
            }
        };
        let paths = serde_json::from_str(&contents)
            .with_context(|| format!("decoding last session from {}", self.path.display()))?;
        Ok(Some(paths))
    }

    pub fn save(&self, paths: &[String]) -> anyhow::Result<()> {
        if env::var_os(NO_SAVE_ENV_VAR).is_some() {
            debug!("last session save disabled by {NO_SAVE_ENV_VAR}");
            return Ok(());
        }
        let dir = self.path.parent().unwrap_or(std::path::Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        temp.write_all(serde_json::to_string(paths)?.as_bytes())?;
        temp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("removing {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> LastRunStore {
        LastRunStore::at(dir.path().join("groktest.last"))
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&["a.md".to_string(), "b.md".to_string()]).unwrap();
        assert_eq!(
            store.load().unwrap().unwrap(),
            vec!["a.md".to_string(), "b.md".to_string()]
        );
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&["a.md".to_string()]).unwrap();
        store.save(&["b.md".to_string()]).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), vec!["b.md".to_string()]);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&["a.md".to_string()]).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }
}
