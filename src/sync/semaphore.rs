// -- semaphore.rs --

use {
    super::{lock, wait, Arc, Condvar, Mutex},
    log::trace,
};

// --

#[cfg_attr(test, derive(Debug))]
struct _Count {
    // negative: number of blocked acquirers
    value: isize,
    // granted but not yet consumed by a waiter
    wakeups: usize,
}

#[cfg_attr(test, derive(Debug))]
struct _Semaphore {
    count: Mutex<_Count>,
    cv: Condvar,
}

/// Counting semaphore with explicit wakeup accounting.
///
/// A blocked `acquire` only returns after it consumed a wakeup issued by a
/// `release`, so spurious condvar returns never admit an extra holder and
/// no release is lost.
#[derive(Clone)]
pub struct Semaphore(Arc<_Semaphore>);
impl Semaphore {
    pub fn new(count: isize) -> Self {
        Self(Arc::new(_Semaphore {
            count: Mutex::new(_Count {
                value: count,
                wakeups: 0,
            }),
            cv: Condvar::new(),
        }))
    }
    pub fn acquire(&self) {
        let mut g = lock(&self.0.count, "semaphore");
        g.value -= 1;
        if g.value < 0 {
            trace!("semaphore: blocking, count {}", g.value);
            // always queue behind pending wakeups instead of barging past
            // a waiter that was already signalled
            loop {
                g = wait(&self.0.cv, g, "semaphore");
                if g.wakeups >= 1 {
                    break;
                }
            }
            g.wakeups -= 1;
        }
    }
    pub fn release(&self) {
        let mut g = lock(&self.0.count, "semaphore");
        g.value += 1;
        if g.value <= 0 {
            g.wakeups += 1;
            self.0.cv.notify_one();
        }
    }
    /// Permits left; negative when acquirers are blocked.
    pub fn available(&self) -> isize {
        lock(&self.0.count, "semaphore").value
    }
    #[inline]
    pub fn lock(&self) -> SemaphoreGuard {
        self.acquire();
        SemaphoreGuard(self.clone())
    }
}

pub struct SemaphoreGuard(Semaphore);
impl Drop for SemaphoreGuard {
    #[inline]
    fn drop(&mut self) {
        self.0.release();
    }
}

// --
