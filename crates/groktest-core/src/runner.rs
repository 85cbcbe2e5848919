//! The runner state machine.
//!
//! Running a document happens in two phases so runtime construction stays
//! outside the core: [`plan_file`] reads the document, resolves config, and
//! extracts tests; [`run_plan`] drives a provided runtime through the
//! tests in source order, applying skip/solo/skiprest/fails/fail-fast
//! semantics and collecting a summary.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::config;
use crate::error::Error;
use crate::error::Result;
use crate::extract::parse_tests;
use crate::extract::Test;
use crate::front_matter::parse_front_matter;
use crate::matching::format_match_actual;
use crate::matching::format_match_expected;
use crate::matching::match_test_output;
use crate::options::effective_options;
use crate::options::is_enabled;
use crate::report;
use crate::runtime::Runtime;
use crate::runtime::RuntimeScope;
use crate::spec::TestSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLocation {
    pub filename: String,
    pub line: usize,
}

impl TestLocation {
    fn of(test: &Test) -> Self {
        TestLocation {
            filename: test.filename.clone(),
            line: test.line,
        }
    }
}

impl std::fmt::Display for TestLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    pub tested: Vec<TestLocation>,
    pub failed: Vec<TestLocation>,
    pub skipped: Vec<TestLocation>,
}

impl TestSummary {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: TestSummary) {
        self.tested.extend(other.tested);
        self.failed.extend(other.failed);
        self.skipped.extend(other.skipped);
    }
}

/// A planned document: resolved config, selected test type, and the
/// extracted tests. Tests are immutable once planned.
#[derive(Debug, Clone)]
pub struct FilePlan {
    pub filename: String,
    pub spec: &'static TestSpec,
    pub tests: Vec<Test>,
    pub config: Map<String, Value>,
}

impl FilePlan {
    /// The document's `retry-on-fail` count from its resolved options.
    pub fn retry_on_fail(&self) -> u32 {
        let options = crate::options::decode_config_options(&self.config, &self.filename);
        crate::options::opt_int(&options, "retry-on-fail")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }
}

/// Reads a document and prepares it for running.
///
/// `project_config` overrides ancestor discovery when given; `cli_config`
/// carries CLI-synthesized entries merged between project config and front
/// matter.
pub fn plan_file(
    path: &Path,
    project_config: Option<&Map<String, Value>>,
    cli_config: &Map<String, Value>,
) -> Result<FilePlan> {
    let filename = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let fm = parse_front_matter(&contents, &filename);
    let discovered;
    let project = match project_config {
        Some(config) => Some(config),
        None => {
            discovered = config::find_project_config(path);
            discovered.as_ref()
        }
    };
    let resolved = config::resolve_test_config(&fm.config, project, cli_config);
    let spec = match config::test_type(&resolved) {
        Some(test_type) => crate::spec::spec_for_type(test_type)?,
        None => crate::spec::DEFAULT_SPEC,
    };
    let body: String = contents.split_inclusive('\n').skip(fm.lines).collect();
    let tests = parse_tests(&body, spec, &filename, fm.lines)?;
    Ok(FilePlan {
        filename,
        spec,
        tests,
        config: resolved,
    })
}

/// Runs a planned document against a runtime, writing failure reports
/// through `printer`. The runtime is stopped on every exit path.
pub fn run_plan(
    plan: &FilePlan,
    runtime: Box<dyn Runtime>,
    printer: &mut dyn FnMut(&str),
    cancel: Option<&Arc<AtomicBool>>,
) -> Result<TestSummary> {
    if plan.tests.is_empty() {
        printer(&format!("Nothing tested in {}", plan.filename));
        return Ok(TestSummary::default());
    }
    let state = RunnerState::new(plan, runtime)?;
    state.run(printer, cancel)
}

struct RunnerState<'a> {
    plan: &'a FilePlan,
    scope: RuntimeScope,
    summary: TestSummary,
    solo_active: bool,
    skiprest: bool,
    parse_types: Map<String, Value>,
}

impl<'a> RunnerState<'a> {
    fn new(plan: &'a FilePlan, runtime: Box<dyn Runtime>) -> Result<Self> {
        let mut scope = RuntimeScope::new(runtime);
        scope.runtime().start()?;
        scope.runtime().init_for_tests(&plan.config)?;
        let solo_active = plan
            .tests
            .iter()
            .any(|test| test.options.get("solo") == Some(&Value::Bool(true)));
        Ok(RunnerState {
            plan,
            scope,
            summary: TestSummary::default(),
            solo_active,
            skiprest: false,
            parse_types: config::parse_types(&plan.config),
        })
    }

    fn run(
        mut self,
        printer: &mut dyn FnMut(&str),
        cancel: Option<&Arc<AtomicBool>>,
    ) -> Result<TestSummary> {
        for (index, test) in self.plan.tests.iter().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                return Err(Error::Interrupted);
            }
            let failed = self.apply_test(test, printer)?;
            if failed && self.fail_fast_enabled(test) {
                self.skip_remaining(index + 1);
                break;
            }
        }
        Ok(self.summary)
    }

    /// Runs one test. Returns true when the test failed.
    fn apply_test(&mut self, test: &Test, printer: &mut dyn FnMut(&str)) -> Result<bool> {
        let options = effective_options(test, &self.plan.config, self.plan.spec);

        if self.skiprest {
            if test.options.get("skiprest") == Some(&Value::Bool(false)) {
                self.skiprest = false;
            } else {
                self.summary.skipped.push(TestLocation::of(test));
                return Ok(false);
            }
        }
        if self.solo_active && !is_enabled(&options, "solo", false) {
            self.summary.skipped.push(TestLocation::of(test));
            return Ok(false);
        }
        if skip_requested(&options) {
            self.summary.skipped.push(TestLocation::of(test));
            return Ok(false);
        }
        if test.is_comment_only() {
            // Option-only directive; nothing to execute or count.
            self.latch_skiprest(&options);
            return Ok(false);
        }

        let output = self.scope.runtime().exec_test_expr(test, &options)?;
        let expected = format_match_expected(&test.expected, &options, self.plan.spec);
        let actual = format_match_actual(&output.output, &options);
        let result = match_test_output(&expected, &actual, &options, &self.parse_types)?;
        debug!(
            matched = result.matched,
            code = output.code,
            "result for {}:{}",
            test.filename,
            test.line
        );

        let fails = is_enabled(&options, "fails", false);
        let passed = result.matched != fails;
        self.summary.tested.push(TestLocation::of(test));
        if passed {
            if result.matched && !result.vars.is_empty() {
                self.scope.runtime().handle_test_match(&result.vars)?;
            }
        } else {
            if fails {
                report::print_unexpected_pass(printer, test);
            } else {
                report::print_failure(printer, test, &output, &options, self.plan.spec);
            }
            self.summary.failed.push(TestLocation::of(test));
        }
        self.latch_skiprest(&options);
        Ok(!passed)
    }

    fn latch_skiprest(&mut self, options: &Map<String, Value>) {
        if is_enabled(options, "skiprest", false) {
            self.skiprest = true;
        }
    }

    fn fail_fast_enabled(&self, test: &Test) -> bool {
        let options = effective_options(test, &self.plan.config, self.plan.spec);
        config::config_bool(&self.plan.config, "fail-fast")
            || is_enabled(&options, "fail-fast", false)
    }

    fn skip_remaining(&mut self, from: usize) {
        for test in &self.plan.tests[from..] {
            self.summary.skipped.push(TestLocation::of(test));
        }
    }
}

/// Whether the `skip` option asks for this test to be skipped. A string
/// value names an environment variable: `NAME` skips when set and
/// non-empty, `!NAME` when unset or empty.
fn skip_requested(options: &Map<String, Value>) -> bool {
    match options.get("skip") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.strip_prefix('!') {
            Some(name) => env::var(name).map_or(true, |val| val.is_empty()),
            None => env::var(s).map_or(false, |val| !val.is_empty()),
        },
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => false,
    }
}
