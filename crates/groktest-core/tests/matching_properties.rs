//! Matching engine properties across strategies and pre-processing.

use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use groktest_core::matching::format_match_actual;
use groktest_core::matching::format_match_expected;
use groktest_core::matching::parse_match;
use groktest_core::matching::str_match;
use groktest_core::spec::PYTHON_SPEC;

fn options(v: Value) -> Map<String, Value> {
    v.as_object().unwrap().clone()
}

const CORPUS: &[&str] = &[
    "",
    "one\n",
    "two lines\nof text\n",
    "  leading spaces\n",
    "punctuation: () [] +*?\n",
    "unicode \u{2936} and beyond\n",
];

#[test]
fn test_literal_match_is_reflexive_over_corpus() {
    for sample in CORPUS {
        assert!(
            str_match(sample, sample, &Map::new()).matched,
            "sample: {sample:?}"
        );
    }
}

#[test]
fn test_parse_without_placeholders_agrees_with_literal_over_corpus() {
    for expected in CORPUS {
        for actual in CORPUS {
            let literal = str_match(expected, actual, &Map::new()).matched;
            let parsed = parse_match(expected, actual, &Map::new(), &Map::new())
                .unwrap()
                .matched;
            assert_eq!(
                literal, parsed,
                "expected: {expected:?}, actual: {actual:?}"
            );
        }
    }
}

#[test]
fn test_wildcard_alone_matches_anything() {
    let opts = options(json!({"wildcard": "..."}));
    for actual in CORPUS {
        assert!(
            str_match("...", actual, &opts).matched,
            "actual: {actual:?}"
        );
    }
}

#[test]
fn test_wildcard_disabled_treats_token_literally() {
    assert!(str_match("...\n", "...\n", &Map::new()).matched);
    assert!(!str_match("...\n", "anything\n", &Map::new()).matched);
}

#[test]
fn test_whitespace_type_captures_gap() {
    let result = parse_match("a{gap:s}b\n", "a   \t b\n", &Map::new(), &Map::new()).unwrap();
    assert!(result.matched);
    assert_eq!(result.vars.get("gap"), Some(&json!("   \t ")));
}

#[test]
fn test_untyped_capture_spans_lines() {
    let result = parse_match(
        "start\n{body}\nend\n",
        "start\nline1\nline2\nend\n",
        &Map::new(),
        &Map::new(),
    )
    .unwrap();
    assert!(result.matched);
    assert_eq!(result.vars.get("body"), Some(&json!("line1\nline2")));
}

#[test]
fn test_multiple_captures_bind_in_one_match() {
    let result = parse_match(
        "{a:w} and {b:d} and {c}\n",
        "x and 7 and the rest\n",
        &Map::new(),
        &Map::new(),
    )
    .unwrap();
    assert_eq!(result.vars.get("a"), Some(&json!("x")));
    assert_eq!(result.vars.get("b"), Some(&json!(7)));
    assert_eq!(result.vars.get("c"), Some(&json!("the rest")));
}

#[test]
fn test_repeated_name_keeps_last_binding() {
    let result = parse_match(
        "{n:d} then {n:d}\n",
        "1 then 2\n",
        &Map::new(),
        &Map::new(),
    )
    .unwrap();
    assert!(result.matched);
    assert_eq!(result.vars.get("n"), Some(&json!(2)));
}

#[test]
fn test_case_insensitive_wildcard_combination() {
    let opts = options(json!({"case": false, "wildcard": "..."}));
    assert!(str_match("HELLO ...\n", "hello there\n", &opts).matched);
}

#[test]
fn test_blankline_and_wildcard_together() {
    let opts = options(json!({"wildcard": "..."}));
    let expected = format!("header\n{}\n...", PYTHON_SPEC.blankline_marker);
    let formatted = format_match_expected(&expected, &opts, &PYTHON_SPEC);
    let actual = "header\n\ntail line\n";
    assert!(str_match(&formatted, actual, &opts).matched);
}

#[test]
fn test_format_actual_is_idempotent() {
    for sample in CORPUS {
        let once = format_match_actual(sample, &Map::new());
        let twice = format_match_actual(&once, &Map::new());
        assert_eq!(once, twice, "sample: {sample:?}");
    }
}

#[test]
fn test_preprocessed_expected_matches_runtime_shaped_output() {
    // Expected blocks never carry trailing newlines from extraction;
    // runtime output always does. Pre-processing reconciles the two.
    let expected = format_match_expected("42", &Map::new(), &PYTHON_SPEC);
    let actual = format_match_actual("42\n", &Map::new());
    assert!(str_match(&expected, &actual, &Map::new()).matched);
}

#[test]
fn test_space_normalization_before_match() {
    let opts = options(json!({"space": false}));
    let expected = format_match_expected("a   b\nc d", &opts, &PYTHON_SPEC);
    let actual = format_match_actual("a b\nc      d\n", &opts);
    assert!(str_match(&expected, &actual, &opts).matched);
}

#[test]
fn test_parse_rejects_partial_match() {
    let result = parse_match(
        "count: {n:d}\n",
        "count: 5 (approx)\n",
        &Map::new(),
        &Map::new(),
    )
    .unwrap();
    assert!(!result.matched);
}
