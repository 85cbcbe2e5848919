//! Per-failure reports.
//!
//! Failures print in the expected/got form, or as a unified diff under the
//! `diff` option. Reports are written through the caller's printer sink so
//! concurrent documents never interleave.

use serde_json::Map;
use serde_json::Value;

use crate::extract::Test;
use crate::matching::blankline_marker;
use crate::options::is_enabled;
use crate::runtime::TestOutput;
use crate::spec::TestSpec;

pub const FAILURE_SEP: &str =
    "**********************************************************************";

pub fn print_failure(
    printer: &mut dyn FnMut(&str),
    test: &Test,
    result: &TestOutput,
    options: &Map<String, Value>,
    spec: &TestSpec,
) {
    print_failure_header(printer, test);
    let got = format_result_output(&result.output, options, spec);
    if is_enabled(options, "diff", false) {
        printer("Differences (expected, got):");
        for line in unified_diff(&test.expected, &got) {
            printer(&format!("  {line}"));
        }
        return;
    }
    if test.expected.is_empty() {
        printer("Expected nothing");
    } else {
        printer("Expected:");
        print_indented(printer, &test.expected);
    }
    if got.is_empty() {
        printer("Got nothing");
    } else {
        printer("Got:");
        print_indented(printer, &got);
    }
}

/// Report for a test that carried `fails` but passed.
pub fn print_unexpected_pass(printer: &mut dyn FnMut(&str), test: &Test) {
    print_failure_header(printer, test);
    printer("Expected test to fail but passed");
}

fn print_failure_header(printer: &mut dyn FnMut(&str), test: &Test) {
    printer(FAILURE_SEP);
    printer(&format!("File \"{}\", line {}", test.filename, test.line));
    printer("Failed example:");
    print_indented(printer, &test.expr);
}

fn print_indented(printer: &mut dyn FnMut(&str), s: &str) {
    for line in s.split('\n') {
        printer(&format!("    {line}"));
    }
}

/// Prepares actual output for display: empty lines become the blank-line
/// marker and the trailing newline is dropped.
fn format_result_output(output: &str, options: &Map<String, Value>, spec: &TestSpec) -> String {
    let mut lines: Vec<&str> = output.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    match blankline_marker(options, spec) {
        Some(marker) => lines
            .iter()
            .map(|line| if line.trim().is_empty() { marker } else { line })
            .collect::<Vec<_>>()
            .join("\n"),
        None => lines.join("\n"),
    }
}

/// A minimal unified diff over lines, LCS-based. Inputs here are a few
/// dozen lines at most.
fn unified_diff(expected: &str, got: &str) -> Vec<String> {
    let a: Vec<&str> = if expected.is_empty() {
        vec![]
    } else {
        expected.split('\n').collect()
    };
    let b: Vec<&str> = if got.is_empty() {
        vec![]
    } else {
        got.split('\n').collect()
    };

    let lcs = lcs_table(&a, &b);
    let mut lines = vec!["--- expected".to_string(), "+++ got".to_string()];
    let mut i = 0;
    let mut j = 0;
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            lines.push(format!(" {}", a[i]));
            i += 1;
            j += 1;
        } else if i < a.len() && (j == b.len() || lcs[i + 1][j] >= lcs[i][j + 1]) {
            lines.push(format!("-{}", a[i]));
            i += 1;
        } else {
            lines.push(format!("+{}", b[j]));
            j += 1;
        }
    }
    lines
}

fn lcs_table(a: &[&str], b: &[&str]) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}
