//! Shared harness for CLI integration tests.

use std::path::Path;
use std::path::PathBuf;

use assert_cmd::assert::Assert;
use assert_cmd::Command;

pub struct TestHarness {
    dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        TestHarness {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a test document into the harness directory.
    pub fn write_doc(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write test document");
        path
    }

    /// A groktest command rooted in the harness directory. The last-run
    /// record is isolated into the harness and color is disabled.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("groktest").expect("groktest binary");
        cmd.current_dir(self.dir.path())
            .env("TMPDIR", self.dir.path())
            .env("NO_COLOR", "1")
            .env_remove("GROKTEST_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Assert {
        self.cmd().args(args).assert()
    }
}
