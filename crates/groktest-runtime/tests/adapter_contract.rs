//! Adapter-contract tests.
//!
//! Every runtime behind `runtime_for_key` must satisfy the same lifecycle:
//! start, optional init, serialized expression dispatch, variable binding,
//! and idempotent stop. Shell runs everywhere `sh` exists; Python cases
//! skip when `python3` is not on PATH.

use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use groktest_core::runtime::Runtime;
use groktest_core::Test;
use groktest_runtime::runtime_for_key;

fn sample_test(expr: &str) -> Test {
    Test {
        filename: "doc.md".to_string(),
        line: 1,
        expr: expr.to_string(),
        expected: String::new(),
        options: Map::new(),
    }
}

fn options(v: Value) -> Map<String, Value> {
    v.as_object().unwrap().clone()
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok()
}

struct ContractCase {
    key: &'static str,
    print_expr: String,
    bind_probe: String,
}

fn contract_cases() -> Vec<ContractCase> {
    let mut cases = vec![ContractCase {
        key: "shell",
        print_expr: "echo contract".to_string(),
        bind_probe: "echo \"$probe\"".to_string(),
    }];
    if python_available() {
        cases.push(ContractCase {
            key: "python",
            print_expr: "print(\"contract\")".to_string(),
            bind_probe: "print(probe)".to_string(),
        });
    } else {
        eprintln!("skipping python contract case: python3 not available");
    }
    cases
}

#[test]
fn test_lifecycle_availability() {
    for case in contract_cases() {
        let mut runtime = runtime_for_key(case.key).unwrap();
        assert!(!runtime.is_available(), "{}: before start", case.key);
        runtime.start().unwrap();
        assert!(runtime.is_available(), "{}: after start", case.key);
        runtime.stop();
        assert!(!runtime.is_available(), "{}: after stop", case.key);
        runtime.stop();
    }
}

#[test]
fn test_exec_returns_captured_output() {
    for case in contract_cases() {
        let mut runtime = runtime_for_key(case.key).unwrap();
        runtime.start().unwrap();
        runtime.init_for_tests(&Map::new()).unwrap();
        let out = runtime
            .exec_test_expr(&sample_test(&case.print_expr), &Map::new())
            .unwrap();
        assert_eq!(out.code, 0, "{}", case.key);
        assert_eq!(out.output, "contract\n", "{}", case.key);
        assert!(out.short_error.is_none(), "{}", case.key);
        runtime.stop();
    }
}

#[test]
fn test_bound_vars_visible_to_later_tests() {
    for case in contract_cases() {
        let mut runtime = runtime_for_key(case.key).unwrap();
        runtime.start().unwrap();
        runtime.init_for_tests(&Map::new()).unwrap();
        let vars = options(json!({"probe": "bound-value"}));
        runtime.handle_test_match(&vars).unwrap();
        let out = runtime
            .exec_test_expr(&sample_test(&case.bind_probe), &Map::new())
            .unwrap();
        assert_eq!(out.output, "bound-value\n", "{}", case.key);
        runtime.stop();
    }
}

#[test]
fn test_failed_expression_reports_code_and_output() {
    for case in contract_cases() {
        let mut runtime = runtime_for_key(case.key).unwrap();
        runtime.start().unwrap();
        let expr = match case.key {
            "shell" => "echo failing; exit 9".to_string(),
            _ => "raise ValueError(\"failing\")".to_string(),
        };
        let out = runtime
            .exec_test_expr(&sample_test(&expr), &Map::new())
            .unwrap();
        assert_eq!(out.code, 1, "{}", case.key);
        assert!(out.output.contains("failing"), "{}", case.key);
        assert!(out.short_error.is_some(), "{}", case.key);
        runtime.stop();
    }
}

#[test]
fn test_expressions_run_serialized_in_order() {
    for case in contract_cases() {
        let mut runtime = runtime_for_key(case.key).unwrap();
        runtime.start().unwrap();
        for n in 1..=3 {
            let expr = match case.key {
                "shell" => format!("echo {n}"),
                _ => format!("print({n})"),
            };
            let out = runtime
                .exec_test_expr(&sample_test(&expr), &Map::new())
                .unwrap();
            assert_eq!(out.output, format!("{n}\n"), "{}", case.key);
        }
        runtime.stop();
    }
}
