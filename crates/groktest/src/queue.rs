//! Cross-document work distribution.
//!
//! Documents run concurrently, but each owns a private output buffer and
//! result slot; the main thread flushes them in queue order so reports
//! from different documents never interleave.

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;

use groktest_common::mutex_lock_or_recover;
use groktest_core::Error;
use groktest_core::TestSummary;

pub type DocResult = Result<TestSummary, Error>;

pub struct DocTask {
    pub path: PathBuf,
    output: Mutex<String>,
    result: Mutex<Option<DocResult>>,
    done: Condvar,
}

impl DocTask {
    fn new(path: PathBuf) -> Self {
        DocTask {
            path,
            output: Mutex::new(String::new()),
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    pub fn print_line(&self, line: &str) {
        let mut output = mutex_lock_or_recover(&self.output);
        output.push_str(line);
        output.push('\n');
    }

    pub fn take_output(&self) -> String {
        std::mem::take(&mut *mutex_lock_or_recover(&self.output))
    }

    pub fn set_result(&self, result: DocResult) {
        let mut slot = mutex_lock_or_recover(&self.result);
        *slot = Some(result);
        self.done.notify_all();
    }

    /// Blocks until the owning worker posts this document's result.
    pub fn wait_result(&self) -> DocResult {
        let mut slot = mutex_lock_or_recover(&self.result);
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            slot = match self.done.wait(slot) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

pub struct DocQueue {
    tasks: Vec<Arc<DocTask>>,
    next: AtomicUsize,
}

impl DocQueue {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        DocQueue {
            tasks: paths.into_iter().map(|p| Arc::new(DocTask::new(p))).collect(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Claims the next unprocessed document, if any.
    pub fn next_task(&self) -> Option<Arc<DocTask>> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.tasks.get(index).cloned()
    }

    /// All documents in queue order.
    pub fn tasks(&self) -> &[Arc<DocTask>] {
        &self.tasks
    }
}
