//! Test extraction from document bodies.
//!
//! An example block is a PS1-prefixed expression line, zero or more
//! PS2-prefixed continuation lines at the same indent, and an expected
//! output block: the maximal run of following non-blank lines that do not
//! begin with PS1. The scanner yields tests in source order and never
//! evaluates anything.

use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;
use crate::options::decode_expr_options;
use crate::spec::TestSpec;

#[derive(Debug, Clone)]
pub struct Test {
    pub filename: String,
    /// 1-based document line of the first prompt.
    pub line: usize,
    /// Expression text with prompts stripped; continuation lines joined
    /// with newlines.
    pub expr: String,
    /// Expected-output block dedented to the first prompt's indent.
    pub expected: String,
    /// Inline options decoded from the first expression line's trailing
    /// comment.
    pub options: Map<String, Value>,
}

impl Test {
    /// True when the expression carries no code, only an inline comment.
    /// Such tests exist purely as option directives.
    pub fn is_comment_only(&self) -> bool {
        self.expr
            .lines()
            .all(|line| line.trim().is_empty() || line.trim().starts_with('#'))
    }
}

/// Extracts tests from a document body.
///
/// `line_offset` is the number of document lines preceding `body` (the
/// front-matter block), so reported line numbers stay document-absolute.
pub fn parse_tests(
    body: &str,
    spec: &TestSpec,
    filename: &str,
    line_offset: usize,
) -> Result<Vec<Test>> {
    let lines: Vec<&str> = body.lines().collect();
    let mut tests = Vec::new();
    let mut pos = 0;
    while pos < lines.len() {
        let Some(indent) = ps1_indent(lines[pos], spec.ps1) else {
            pos += 1;
            continue;
        };
        let start = pos;
        let line = line_offset + start + 1;
        pos += 1;
        while pos < lines.len() && is_continuation(lines[pos], spec) {
            pos += 1;
        }
        let expr = format_expr(&lines[start..pos], indent, spec, filename, line)?;
        let expected_start = pos;
        while pos < lines.len() && is_expected_line(lines[pos], spec.ps1) {
            pos += 1;
        }
        let expected = format_expected(
            &lines[expected_start..pos],
            indent,
            filename,
            line_offset + expected_start,
        )?;
        let options = decode_expr_options(&expr);
        tests.push(Test {
            filename: filename.to_string(),
            line,
            expr,
            expected,
            options,
        });
    }
    Ok(tests)
}

/// Returns the indent width when `line` is a PS1 line.
fn ps1_indent(line: &str, ps1: &str) -> Option<usize> {
    let stripped = line.trim_start_matches(' ');
    if !stripped.starts_with(ps1) {
        return None;
    }
    Some(line.len() - stripped.len())
}

fn is_continuation(line: &str, spec: &TestSpec) -> bool {
    let Some(ps2) = spec.ps2 else {
        return false;
    };
    line.trim_start_matches(' ').starts_with(ps2)
}

fn is_expected_line(line: &str, ps1: &str) -> bool {
    let stripped = line.trim_start_matches(' ');
    !stripped.is_empty() && !stripped.starts_with(ps1)
}

/// Strips indent and prompts from an expression block, joining continuation
/// lines into one logical expression.
fn format_expr(
    lines: &[&str],
    indent: usize,
    spec: &TestSpec,
    filename: &str,
    first_line: usize,
) -> Result<String> {
    let prefix = " ".repeat(indent);
    let mut parts = Vec::with_capacity(lines.len());
    for (i, raw) in lines.iter().enumerate() {
        let prompt = if i == 0 {
            spec.ps1
        } else {
            spec.ps2.expect("continuation scanned without ps2")
        };
        let dedented = raw.strip_prefix(prefix.as_str()).ok_or_else(|| {
            Error::test_parse(filename, first_line + i, "inconsistent leading whitespace")
        })?;
        let content = dedented.strip_prefix(prompt).ok_or_else(|| {
            Error::test_parse(filename, first_line + i, "space missing after prompt")
        })?;
        if content.is_empty() {
            parts.push("");
        } else if let Some(rest) = content.strip_prefix(' ') {
            parts.push(rest);
        } else {
            return Err(Error::test_parse(
                filename,
                first_line + i,
                "space missing after prompt",
            ));
        }
    }
    Ok(parts.join("\n"))
}

/// Dedents the expected block to the expression's indent.
fn format_expected(
    lines: &[&str],
    indent: usize,
    filename: &str,
    line_offset: usize,
) -> Result<String> {
    let prefix = " ".repeat(indent);
    let mut dedented = Vec::with_capacity(lines.len());
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.strip_prefix(prefix.as_str()).ok_or_else(|| {
            Error::test_parse(
                filename,
                line_offset + i + 1,
                "inconsistent leading whitespace",
            )
        })?;
        dedented.push(line);
    }
    Ok(dedented.join("\n"))
}
