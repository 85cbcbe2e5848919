//! Interrupt handling.
//!
//! SIGINT and SIGTERM set a shared cancel flag. The runner checks the flag
//! between tests, stops its runtime, and the session exits nonzero.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use signal_hook::consts::SIGINT;
use signal_hook::consts::SIGTERM;
use signal_hook::iterator::Signals;
use tracing::info;

pub fn install() -> anyhow::Result<Arc<AtomicBool>> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!(signal = sig, "received signal, stopping tests");
                flag.store(true, Ordering::SeqCst);
            }
        })?;
    Ok(cancel)
}
