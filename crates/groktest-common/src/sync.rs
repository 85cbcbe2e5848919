use std::sync::Mutex;
use std::sync::MutexGuard;

/// Acquires a mutex lock, recovering from poison if a thread panicked while holding it.
///
/// # Warning
/// If this function recovers from a poisoned lock, it means another thread panicked
/// while holding the lock. The data may be in an inconsistent state. This recovery
/// is intentional so one broken test document cannot wedge the whole session, but
/// errors should be investigated.
pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        eprintln!(
            "ERROR: Mutex poisoned - a thread panicked while holding this lock. \
             Data may be inconsistent. Attempting recovery."
        );
        poisoned.into_inner()
    })
}
