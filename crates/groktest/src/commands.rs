use clap::Parser;

const AFTER_LONG_HELP: &str = r#"DOCUMENTS:
    Tests are example blocks in plain-text files: an expression line
    prefixed with the test type's prompt, followed by its expected output.

        >>> 1 + 1
        2

    Front matter between leading '---' fences configures the document:

        ---
        test-type: shell
        test-options: +wildcard
        ---

EXAMPLES:
    # Test specific files
    groktest README.md docs/*.md

    # Test a project suite (pyproject.toml with a [tool.groktest] table)
    groktest .

    # Re-run the previous session, stopping at the first failure
    groktest --last --fail-fast

    # List tests without running them
    groktest --preview docs/guide.md"#;

#[derive(Debug, Parser)]
#[command(name = "groktest")]
#[command(version)]
#[command(about = "Run example tests embedded in plain-text documents")]
#[command(after_long_help = AFTER_LONG_HELP)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Project suite or files to test.
    #[arg(value_name = "[PROJECT [SUITE]] | [FILE...]")]
    pub paths: Vec<String>,

    /// Show tests without running them.
    #[arg(long)]
    pub preview: bool,

    /// Re-run last tests.
    #[arg(long)]
    pub last: bool,

    /// Stop on the first error for a file.
    #[arg(short = 'f', long)]
    pub fail_fast: bool,

    /// Max number of concurrent test files.
    #[arg(short = 'C', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Show skipped tests in output.
    #[arg(long)]
    pub show_skipped: bool,

    /// Show debug info.
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output.
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::BoolishValueParser::new())]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_asserts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_files() {
        let cli = Cli::parse_from(["groktest", "a.md", "b.md"]);
        assert_eq!(cli.paths, vec!["a.md", "b.md"]);
        assert!(!cli.fail_fast);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from(["groktest", "-f", "-C", "4", "--show-skipped", "a.md"]);
        assert!(cli.fail_fast);
        assert_eq!(cli.concurrency, Some(4));
        assert!(cli.show_skipped);
    }

    #[test]
    fn test_parse_preview_and_last() {
        let cli = Cli::parse_from(["groktest", "--preview", "--last"]);
        assert!(cli.preview);
        assert!(cli.last);
    }
}
