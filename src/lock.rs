use std::sync::{Mutex, MutexGuard};

/// Lock shared trigger state, taking over a poisoned lock instead of panicking.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        crate::log_debug(&format!("mutex poisoned in {context}; recovering"));
        tracing::warn!(context, "mutex poisoned; recovering");
        poisoned.into_inner()
    })
}
