//! Session orchestration.
//!
//! Resolves the test file set (project suite or explicit files), fans
//! documents out to worker threads, flushes per-document output in order,
//! and prints the final summary.

use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use anyhow::bail;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use groktest_common::color_init;
use groktest_common::Colors;
use groktest_core::config::load_project_config;
use groktest_core::plan_file;
use groktest_core::run_plan;
use groktest_core::Error;
use groktest_core::TestSummary;
use groktest_runtime::runtime_for_key;

use crate::commands::Cli;
use crate::discover;
use crate::last_run::LastRunStore;
use crate::queue::DocQueue;
use crate::queue::DocResult;
use crate::queue::DocTask;
use crate::signals;
use crate::telemetry;

pub const EXIT_FAILED: i32 = 1;
pub const EXIT_NO_TESTS: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

const DEFAULT_CONCURRENCY: usize = 8;

struct RunContext {
    project_config: Option<Map<String, Value>>,
    cli_config: Map<String, Value>,
    cancel: Arc<AtomicBool>,
}

/// Runs a session and returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let _telemetry = telemetry::init_tracing(if cli.debug { "debug" } else { "warn" });
    color_init(cli.no_color);

    let store = LastRunStore::new();
    let paths = session_paths(&cli, &store)?;
    let cli_config = cli_synthesized_config(&cli);
    let (project_config, filenames) = resolve_file_set(&paths)?;

    if cli.preview {
        return preview(&filenames, project_config.as_ref(), &cli_config);
    }

    let show_skipped = cli.show_skipped
        || project_config
            .as_ref()
            .is_some_and(|config| groktest_core::config::config_bool(config, "show-skipped"));

    let cancel = signals::install()?;
    let queue = Arc::new(DocQueue::new(filenames));
    let context = Arc::new(RunContext {
        project_config,
        cli_config,
        cancel: cancel.clone(),
    });

    let worker_count = cli
        .concurrency
        .unwrap_or(DEFAULT_CONCURRENCY)
        .max(1)
        .min(queue.len());
    let workers: Vec<_> = (0..worker_count)
        .map(|index| {
            let queue = queue.clone();
            let context = context.clone();
            thread::Builder::new()
                .name(format!("groktest-worker-{index}"))
                .spawn(move || run_worker(&queue, &context))
        })
        .collect::<std::io::Result<_>>()?;

    let mut session = TestSummary::default();
    let mut had_errors = false;
    let mut interrupted = false;
    for task in queue.tasks() {
        println!("Testing {}", display_path(&task.path));
        let result = task.wait_result();
        let output = task.take_output();
        if !output.is_empty() {
            print!("{output}");
        }
        match result {
            Ok(summary) => session.merge(summary),
            Err(Error::Interrupted) => {
                interrupted = true;
                break;
            }
            Err(err) if err.is_document_skip() => {
                warn!("{err}, skipping {}", display_path(&task.path));
            }
            Err(err) => {
                eprintln!(
                    "{} testing {}: {err}",
                    Colors::failed("Error"),
                    display_path(&task.path)
                );
                had_errors = true;
            }
        }
    }
    for worker in workers {
        let _ = worker.join();
    }
    if interrupted || cancel.load(Ordering::SeqCst) {
        eprintln!("Interrupted");
        return Ok(EXIT_INTERRUPTED);
    }
    Ok(print_summary(&session, show_skipped, had_errors))
}

/// Paths for this session: the previous session's under `--last`, the
/// command line's otherwise (recorded for the next `--last`).
fn session_paths(cli: &Cli, store: &LastRunStore) -> anyhow::Result<Vec<String>> {
    if cli.last {
        match store.load()? {
            Some(paths) if !paths.is_empty() => Ok(paths),
            _ => bail!("Run at least one test before using --last"),
        }
    } else {
        store.save(&cli.paths)?;
        Ok(cli.paths.clone())
    }
}

fn cli_synthesized_config(cli: &Cli) -> Map<String, Value> {
    let mut config = Map::new();
    if cli.fail_fast {
        config.insert("fail-fast".to_string(), Value::Bool(true));
    }
    if cli.show_skipped {
        config.insert("show-skipped".to_string(), Value::Bool(true));
    }
    config
}

/// Interprets positionals: a project path expands to its suite via
/// `include`/`exclude` globs; anything else is a list of test files.
fn resolve_file_set(
    paths: &[String],
) -> anyhow::Result<(Option<Map<String, Value>>, Vec<PathBuf>)> {
    let mut filenames: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
    let mut project_config = None;
    if let Some(first) = paths.first() {
        if let Some(project_path) = discover::project_candidate(first) {
            match load_project_config(&project_path) {
                Ok(Some(config)) => {
                    if paths.len() > 1 {
                        bail!(
                            "extra arguments '{}' to project path not currently supported",
                            paths[1..].join(" ")
                        );
                    }
                    filenames = discover::suite_filenames(&config)?;
                    project_config = Some(config);
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(
                        "Error loading project config from {}: {err}",
                        project_path.display()
                    );
                }
            }
        }
    }
    filenames.sort();
    Ok((project_config, filenames))
}

fn preview(
    filenames: &[PathBuf],
    project_config: Option<&Map<String, Value>>,
    cli_config: &Map<String, Value>,
) -> anyhow::Result<i32> {
    for path in filenames {
        println!("Testing {} (preview)", display_path(path));
        match plan_file(path, project_config, cli_config) {
            Ok(plan) => {
                for test in &plan.tests {
                    let first_line = test.expr.lines().next().unwrap_or("");
                    println!("  {}: {}", test.line, first_line);
                }
            }
            Err(err) => warn!("{err}, skipping {}", display_path(path)),
        }
    }
    Ok(0)
}

fn run_worker(queue: &DocQueue, context: &RunContext) {
    while let Some(task) = queue.next_task() {
        if context.cancel.load(Ordering::SeqCst) {
            task.set_result(Err(Error::Interrupted));
            continue;
        }
        let result = run_document(&task, context);
        task.set_result(result);
    }
}

/// Runs one document, honoring its `retry-on-fail` count. Each attempt
/// re-plans the document and starts a fresh runtime.
fn run_document(task: &DocTask, context: &RunContext) -> DocResult {
    let mut attempt = 0;
    loop {
        let plan = plan_file(
            &task.path,
            context.project_config.as_ref(),
            &context.cli_config,
        )?;
        let max_retries = plan.retry_on_fail();
        let runtime = runtime_for_key(plan.spec.runtime_key)?;
        let mut printer = |line: &str| task.print_line(line);
        let summary = run_plan(&plan, runtime, &mut printer, Some(&context.cancel))?;
        if !summary.failed.is_empty() && attempt < max_retries {
            attempt += 1;
            task.print_line(&format!(
                "Retrying {} ({attempt} of {max_retries})",
                display_path(&task.path)
            ));
            continue;
        }
        return Ok(summary);
    }
}

fn print_summary(summary: &TestSummary, show_skipped: bool, had_errors: bool) -> i32 {
    println!("{}", "-".repeat(70));
    if summary.tested.is_empty() {
        println!("Nothing tested 😴");
        return if had_errors { EXIT_FAILED } else { EXIT_NO_TESTS };
    }
    println!("{} {} run", summary.tested.len(), plural(summary.tested.len()));
    if !summary.skipped.is_empty() {
        println!(
            "{} {} skipped{}",
            summary.skipped.len(),
            plural(summary.skipped.len()),
            if show_skipped {
                ""
            } else {
                " (use --show-skipped to view)"
            }
        );
        if show_skipped {
            for location in &summary.skipped {
                println!(" - {}", Colors::dim(&location.to_string()));
            }
        }
    }
    if !summary.failed.is_empty() {
        println!(
            "{}",
            Colors::failed(&format!(
                "{} {} failed 💥 (see above for details)",
                summary.failed.len(),
                plural(summary.failed.len())
            ))
        );
        for location in &summary.failed {
            println!(" - {}", Colors::location(&location.to_string()));
        }
        return EXIT_FAILED;
    }
    if had_errors {
        return EXIT_FAILED;
    }
    println!("{}", Colors::passed("All tests passed 🎉"));
    0
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "test"
    } else {
        "tests"
    }
}

fn display_path(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf));
    match relative {
        Some(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}
