// -- mod.rs --

pub use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use {log::error, std::time::Duration};

mod buffer;
mod completion;
mod semaphore;
pub use buffer::BoundedBuffer;
pub use completion::Completion;
pub use semaphore::{Semaphore, SemaphoreGuard};

// --

// A poisoned mutex means some thread panicked in the middle of a state
// transition; the coordination state can no longer be trusted.
pub(crate) fn lock<'a, T>(m: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match m.lock() {
        Ok(g) => g,
        Err(e) => {
            error!("{}: lock failed: {}", what, e);
            std::process::abort();
        }
    }
}

pub(crate) fn wait<'a, T>(cv: &Condvar, g: MutexGuard<'a, T>, what: &str) -> MutexGuard<'a, T> {
    match cv.wait(g) {
        Ok(g) => g,
        Err(e) => {
            error!("{}: condvar wait failed: {}", what, e);
            std::process::abort();
        }
    }
}

pub(crate) fn wait_timeout<'a, T>(
    cv: &Condvar,
    g: MutexGuard<'a, T>,
    dur: Duration,
    what: &str,
) -> MutexGuard<'a, T> {
    match cv.wait_timeout(g, dur) {
        Ok((g, _)) => g,
        Err(e) => {
            error!("{}: condvar wait failed: {}", what, e);
            std::process::abort();
        }
    }
}
