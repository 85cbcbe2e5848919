//! The expected-vs-actual matching engine.
//!
//! Expected and actual output are pre-processed under the effective options
//! (blank-line markers, path separators, whitespace, case), then compared
//! with one of two strategies: literal string matching with optional
//! wildcard splitting, or parse matching where brace placeholders compile
//! to an anchored regex with named, typed captures.

use regex::Regex;
use serde_json::Map;
use serde_json::Value;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::options::is_enabled;
use crate::options::opt_str;
use crate::spec::TestSpec;

#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matched: bool,
    /// Named captures from a parse match; bound into the runtime scope.
    pub vars: Map<String, Value>,
}

impl MatchResult {
    pub fn matched() -> Self {
        MatchResult {
            matched: true,
            vars: Map::new(),
        }
    }

    pub fn unmatched() -> Self {
        MatchResult::default()
    }
}

/// The blank-line marker in effect, if blank-line handling is enabled.
pub fn blankline_marker<'a>(options: &'a Map<String, Value>, spec: &'a TestSpec) -> Option<&'a str> {
    match options.get("blankline") {
        None | Some(Value::Null) | Some(Value::Bool(true)) => Some(spec.blankline_marker),
        Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => Some(spec.blankline_marker),
    }
}

/// Prepares expected output for matching: appends a trailing newline for
/// non-empty text, substitutes blank-line markers, and normalizes
/// whitespace when `space` is disabled.
pub fn format_match_expected(
    expected: &str,
    options: &Map<String, Value>,
    spec: &TestSpec,
) -> String {
    let mut s = if expected.is_empty() {
        String::new()
    } else {
        format!("{expected}\n")
    };
    if let Some(marker) = blankline_marker(options, spec) {
        s = remove_blankline_markers(&s, marker);
    }
    if !is_enabled(options, "space", true) {
        s = normalize_whitespace(&s);
    }
    s
}

/// Prepares actual output for matching: truncates whitespace-only lines to
/// empty, applies path-separator normalization, and normalizes whitespace
/// when `space` is disabled.
pub fn format_match_actual(actual: &str, options: &Map<String, Value>) -> String {
    let mut s = truncate_empty_line_spaces(actual);
    if is_enabled(options, "paths", false) {
        s = normalize_paths(&s, opt_str(options, "paths").unwrap_or("/"));
    }
    if !is_enabled(options, "space", true) {
        s = normalize_whitespace(&s);
    }
    s
}

fn remove_blankline_markers(s: &str, marker: &str) -> String {
    let pattern = Regex::new(&format!(r"(?m)^{}[ \t]*$", regex::escape(marker)))
        .expect("blankline pattern must compile");
    pattern.replace_all(s, "").into_owned()
}

fn truncate_empty_line_spaces(s: &str) -> String {
    let pattern = Regex::new(r"(?m)^[ \t]+$").expect("empty line pattern must compile");
    pattern.replace_all(s, "").into_owned()
}

fn normalize_paths(s: &str, separator: &str) -> String {
    match separator {
        "\\" => s.replace('/', "\\"),
        _ => s.replace('\\', "/"),
    }
}

/// Collapses whitespace runs within each line and trims line ends. Line
/// structure is preserved.
fn normalize_whitespace(s: &str) -> String {
    let trailing_lf = s.ends_with('\n');
    let mut lines: Vec<String> = s
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    if trailing_lf {
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Matches pre-processed expected against pre-processed actual under the
/// effective options.
pub fn match_test_output(
    expected: &str,
    actual: &str,
    options: &Map<String, Value>,
    parse_types: &Map<String, Value>,
) -> Result<MatchResult> {
    if is_enabled(options, "parse", false) {
        parse_match(expected, actual, options, parse_types)
    } else {
        Ok(str_match(expected, actual, options))
    }
}

/// Literal strategy: equality after case folding, with wildcard splitting
/// when the `wildcard` option carries a token.
pub fn str_match(expected: &str, actual: &str, options: &Map<String, Value>) -> MatchResult {
    let case_sensitive = is_enabled(options, "case", true);
    let (expected, actual) = if case_sensitive {
        (expected.to_string(), actual.to_string())
    } else {
        (expected.to_lowercase(), actual.to_lowercase())
    };
    if is_enabled(options, "wildcard", false) {
        let token = match options.get("wildcard") {
            Some(Value::String(s)) => s.clone(),
            _ => "...".to_string(),
        };
        return wildcard_match(&expected, &actual, &token);
    }
    if expected == actual {
        MatchResult::matched()
    } else {
        MatchResult::unmatched()
    }
}

/// The doctest wildcard algorithm: the first fragment anchors at the
/// start, the last at the end, interior fragments match left-to-right by
/// leftmost find.
fn wildcard_match(expected: &str, actual: &str, token: &str) -> MatchResult {
    let mut parts: Vec<&str> = expected.split(token).collect();
    if parts.len() == 1 {
        return if expected == actual {
            MatchResult::matched()
        } else {
            MatchResult::unmatched()
        };
    }

    let mut startpos = 0;
    let mut endpos = actual.len();

    let first = parts[0];
    if !first.is_empty() {
        if !actual.starts_with(first) {
            return MatchResult::unmatched();
        }
        startpos = first.len();
        parts.remove(0);
    }

    let last = parts[parts.len() - 1];
    if !last.is_empty() {
        if !actual.ends_with(last) {
            return MatchResult::unmatched();
        }
        endpos -= last.len();
        parts.pop();
    }

    if startpos > endpos {
        // Anchored ends overlap, as in matching 'aa...aa' against 'aaa'.
        return MatchResult::unmatched();
    }

    for part in parts {
        match actual[startpos..endpos].find(part) {
            Some(found) => startpos += found + part.len(),
            None => return MatchResult::unmatched(),
        }
    }

    MatchResult::matched()
}

/// Parse strategy: expected is a format string whose `{[name][:type]}`
/// placeholders become regex captures.
pub fn parse_match(
    expected: &str,
    actual: &str,
    options: &Map<String, Value>,
    parse_types: &Map<String, Value>,
) -> Result<MatchResult> {
    let case_sensitive = is_enabled(options, "case", true);
    let compiled = compile_format(expected, parse_types, case_sensitive)?;
    let Some(caps) = compiled.pattern.captures(actual) else {
        return Ok(MatchResult::unmatched());
    };
    let mut vars = Map::new();
    for capture in &compiled.captures {
        if let Some(matched) = caps.name(&capture.group) {
            vars.insert(
                capture.name.clone(),
                capture.coerce(matched.as_str()),
            );
        }
    }
    Ok(MatchResult {
        matched: true,
        vars,
    })
}

struct CompiledFormat {
    pattern: Regex,
    captures: Vec<CaptureSpec>,
}

struct CaptureSpec {
    name: String,
    group: String,
    kind: CaptureKind,
}

enum CaptureKind {
    Integer,
    Raw,
}

impl CaptureSpec {
    fn coerce(&self, matched: &str) -> Value {
        match self.kind {
            CaptureKind::Integer => matched
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(matched.to_string())),
            CaptureKind::Raw => Value::String(matched.to_string()),
        }
    }
}

fn compile_format(
    format: &str,
    parse_types: &Map<String, Value>,
    case_sensitive: bool,
) -> Result<CompiledFormat> {
    let mut body = String::new();
    let mut captures = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(Error::ExpectedPattern(
                                "unterminated placeholder".to_string(),
                            ))
                        }
                    }
                }
                body.push_str(&regex::escape(&literal));
                literal.clear();
                body.push_str(&placeholder_pattern(&field, parse_types, &mut captures)?);
            }
            '}' => {
                return Err(Error::ExpectedPattern(
                    "single '}' encountered in expected output".to_string(),
                ))
            }
            other => literal.push(other),
        }
    }
    body.push_str(&regex::escape(&literal));
    let flags = if case_sensitive { "" } else { "(?i)" };
    let pattern = Regex::new(&format!(r"{flags}\A{body}\z"))
        .map_err(|err| Error::ExpectedPattern(err.to_string()))?;
    Ok(CompiledFormat { pattern, captures })
}

fn placeholder_pattern(
    field: &str,
    parse_types: &Map<String, Value>,
    captures: &mut Vec<CaptureSpec>,
) -> Result<String> {
    let (name, type_name) = match field.split_once(':') {
        Some((name, type_name)) => (name, Some(type_name)),
        None => (field, None),
    };
    let (fragment, kind) = type_fragment(type_name, parse_types)?;
    if name.is_empty() {
        return Ok(format!("(?:{fragment})"));
    }
    if !is_identifier(name) {
        return Err(Error::ExpectedPattern(format!(
            "invalid placeholder name '{name}'"
        )));
    }
    // Regex group names must be unique; vars keep the placeholder name.
    let group = format!("g{}", captures.len());
    captures.push(CaptureSpec {
        name: name.to_string(),
        group: group.clone(),
        kind,
    });
    Ok(format!("(?P<{group}>{fragment})"))
}

fn type_fragment(
    type_name: Option<&str>,
    parse_types: &Map<String, Value>,
) -> Result<(String, CaptureKind)> {
    match type_name {
        None => Ok(((r"(?s:.+?)").to_string(), CaptureKind::Raw)),
        Some("d") => Ok(((r"[-+]?\d+").to_string(), CaptureKind::Integer)),
        Some("w") => Ok(((r"\w+").to_string(), CaptureKind::Raw)),
        Some("s") => Ok(((r"\s+").to_string(), CaptureKind::Raw)),
        Some(custom) => match parse_types.get(custom) {
            Some(Value::String(pattern)) => Ok((format!("(?:{pattern})"), CaptureKind::Raw)),
            Some(other) => {
                warn!("Invalid parse type {custom}: expected pattern string, got {other}");
                Err(Error::ExpectedPattern(format!(
                    "invalid parse type '{custom}'"
                )))
            }
            None => Err(Error::ExpectedPattern(format!(
                "unknown parse type '{custom}'"
            ))),
        },
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::spec::PYTHON_SPEC;

    fn no_options() -> Map<String, Value> {
        Map::new()
    }

    fn options(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_literal_equality() {
        assert!(str_match("2\n", "2\n", &no_options()).matched);
        assert!(!str_match("2\n", "1\n", &no_options()).matched);
    }

    #[test]
    fn test_literal_reflexive() {
        let samples = ["", "one line\n", "a\nb\nc\n", "  indented\n"];
        for s in samples {
            assert!(str_match(s, s, &no_options()).matched);
        }
    }

    #[test]
    fn test_case_folding() {
        let opts = options(json!({"case": false}));
        assert!(str_match("Hello\n", "hello\n", &opts).matched);
        assert!(!str_match("Hello\n", "hello\n", &no_options()).matched);
    }

    #[test]
    fn test_wildcard_basic() {
        let opts = options(json!({"wildcard": "..."}));
        assert!(str_match("hello ...\n", "hello world\n", &opts).matched);
        assert!(str_match("... world\n", "hello world\n", &opts).matched);
        assert!(str_match("a ... c ... e\n", "a b c d e\n", &opts).matched);
    }

    #[test]
    fn test_wildcard_matches_empty_sequence() {
        let opts = options(json!({"wildcard": "..."}));
        assert!(str_match("ab...cd\n", "abcd\n", &opts).matched);
    }

    #[test]
    fn test_wildcard_multiline() {
        let opts = options(json!({"wildcard": "..."}));
        assert!(str_match("first\n...\nlast\n", "first\nmid1\nmid2\nlast\n", &opts).matched);
    }

    #[test]
    fn test_wildcard_overlapping_anchors() {
        let opts = options(json!({"wildcard": "..."}));
        assert!(!str_match("aa...aa", "aaa", &opts).matched);
    }

    #[test]
    fn test_wildcard_order_matters() {
        let opts = options(json!({"wildcard": "..."}));
        assert!(!str_match("b...a\n", "a then b\n", &opts).matched);
    }

    #[test]
    fn test_wildcard_custom_token() {
        let opts = options(json!({"wildcard": "*"}));
        assert!(str_match("hello *\n", "hello anything\n", &opts).matched);
    }

    #[test]
    fn test_parse_named_typed_capture() {
        let result = parse_match(
            "The number {n:d} is here\n",
            "The number 42 is here\n",
            &no_options(),
            &Map::new(),
        )
        .unwrap();
        assert!(result.matched);
        assert_eq!(result.vars.get("n"), Some(&json!(42)));
    }

    #[test]
    fn test_parse_negative_integer() {
        let result = parse_match("{n:d}\n", "-17\n", &no_options(), &Map::new()).unwrap();
        assert_eq!(result.vars.get("n"), Some(&json!(-17)));
    }

    #[test]
    fn test_parse_untyped_placeholder() {
        let result = parse_match(
            "saved to {path}\n",
            "saved to /tmp/out.txt\n",
            &no_options(),
            &Map::new(),
        )
        .unwrap();
        assert_eq!(result.vars.get("path"), Some(&json!("/tmp/out.txt")));
    }

    #[test]
    fn test_parse_anonymous_placeholder() {
        let result =
            parse_match("took {} ms\n", "took 12.5 ms\n", &no_options(), &Map::new()).unwrap();
        assert!(result.matched);
        assert!(result.vars.is_empty());
    }

    #[test]
    fn test_parse_word_type() {
        let result = parse_match("user {u:w}!\n", "user bob!\n", &no_options(), &Map::new())
            .unwrap();
        assert_eq!(result.vars.get("u"), Some(&json!("bob")));
    }

    #[test]
    fn test_parse_literal_braces() {
        let result = parse_match("{{x}}\n", "{x}\n", &no_options(), &Map::new()).unwrap();
        assert!(result.matched);
    }

    #[test]
    fn test_parse_without_placeholders_is_literal() {
        let expected = "a+b (c) [d]\n";
        let parsed = parse_match(expected, expected, &no_options(), &Map::new()).unwrap();
        let literal = str_match(expected, expected, &no_options());
        assert_eq!(parsed.matched, literal.matched);
        assert!(!parse_match(expected, "other\n", &no_options(), &Map::new())
            .unwrap()
            .matched);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let opts = options(json!({"case": false}));
        let result = parse_match("OK {n:d}\n", "ok 1\n", &opts, &Map::new()).unwrap();
        assert!(result.matched);
    }

    #[test]
    fn test_parse_custom_type() {
        let types = options(json!({"hex": "[0-9a-f]+"}));
        let result = parse_match("id {h:hex}\n", "id deadbeef\n", &no_options(), &types).unwrap();
        assert_eq!(result.vars.get("h"), Some(&json!("deadbeef")));
    }

    #[test]
    fn test_parse_custom_type_embedded_flags() {
        let types = options(json!({"word": "(?i)[a-z]+"}));
        let result = parse_match("{w:word}\n", "MiXeD\n", &no_options(), &types).unwrap();
        assert!(result.matched);
    }

    #[test]
    fn test_parse_unknown_type_errors() {
        let err = parse_match("{n:q}\n", "x\n", &no_options(), &Map::new()).unwrap_err();
        assert!(err.to_string().contains("unknown parse type"));
    }

    #[test]
    fn test_parse_unterminated_placeholder_errors() {
        let err = parse_match("{n\n", "x\n", &no_options(), &Map::new()).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_parse_anchored_both_ends() {
        assert!(!parse_match("{n:d}\n", "x 42\n", &no_options(), &Map::new())
            .unwrap()
            .matched);
        assert!(!parse_match("{n:d}\n", "42 x\n", &no_options(), &Map::new())
            .unwrap()
            .matched);
    }

    #[test]
    fn test_format_expected_appends_newline() {
        assert_eq!(
            format_match_expected("2", &no_options(), &PYTHON_SPEC),
            "2\n"
        );
        assert_eq!(format_match_expected("", &no_options(), &PYTHON_SPEC), "");
    }

    #[test]
    fn test_format_expected_blankline_markers() {
        let expected = format!("a\n{}\nb", PYTHON_SPEC.blankline_marker);
        assert_eq!(
            format_match_expected(&expected, &no_options(), &PYTHON_SPEC),
            "a\n\nb\n"
        );
    }

    #[test]
    fn test_blankline_disabled_keeps_marker() {
        let opts = options(json!({"blankline": false}));
        let expected = format!("a\n{}\nb", PYTHON_SPEC.blankline_marker);
        let formatted = format_match_expected(&expected, &opts, &PYTHON_SPEC);
        assert!(formatted.contains(PYTHON_SPEC.blankline_marker));
    }

    #[test]
    fn test_custom_blankline_marker() {
        let opts = options(json!({"blankline": "<BLANKLINE>"}));
        assert_eq!(
            format_match_expected("a\n<BLANKLINE>\nb", &opts, &PYTHON_SPEC),
            "a\n\nb\n"
        );
    }

    #[test]
    fn test_format_actual_truncates_space_only_lines() {
        assert_eq!(
            format_match_actual("a\n   \nb\n", &no_options()),
            "a\n\nb\n"
        );
    }

    #[test]
    fn test_paths_normalization() {
        let opts = options(json!({"paths": true}));
        assert_eq!(format_match_actual("a\\b\\c\n", &opts), "a/b/c\n");
        let opts = options(json!({"paths": "\\"}));
        assert_eq!(format_match_actual("a/b/c\n", &opts), "a\\b\\c\n");
    }

    #[test]
    fn test_space_disabled_collapses_within_lines() {
        let opts = options(json!({"space": false}));
        assert_eq!(
            format_match_expected("a   b\n  c  d  ", &opts, &PYTHON_SPEC),
            "a b\nc d\n"
        );
        assert_eq!(format_match_actual("a \t b\nc\n", &opts), "a b\nc\n");
    }

    #[test]
    fn test_match_dispatch_parse_option() {
        let opts = options(json!({"parse": true}));
        let result =
            match_test_output("n = {n:d}\n", "n = 7\n", &opts, &Map::new()).unwrap();
        assert_eq!(result.vars.get("n"), Some(&json!(7)));
        let result = match_test_output("n = {n:d}\n", "n = 7\n", &no_options(), &Map::new())
            .unwrap();
        assert!(!result.matched);
    }
}
