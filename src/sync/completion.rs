// -- completion.rs --

use {
    super::{lock, wait, wait_timeout, Arc, Condvar, Mutex},
    std::time::{Duration, Instant},
};

// --

#[cfg_attr(test, derive(Debug))]
struct _Completion {
    done: Mutex<bool>,
    cv: Condvar,
}

/// One-shot flag that other threads can block on.
///
/// Once `complete` has been called every current and future `wait` returns
/// until the flag is `reset`.
/// All reads go through the mutex, so whatever the completing thread wrote
/// before `complete` is visible to the waiter afterwards.
#[derive(Clone)]
pub struct Completion(Arc<_Completion>);
impl Completion {
    pub fn new() -> Self {
        Self(Arc::new(_Completion {
            done: Mutex::new(false),
            cv: Condvar::new(),
        }))
    }
    pub fn complete(&self) {
        let mut g = lock(&self.0.done, "completion");
        *g = true;
        self.0.cv.notify_all();
    }
    /// Clears the flag. Only meant for a point where nobody waits on it.
    pub fn reset(&self) {
        *lock(&self.0.done, "completion") = false;
    }
    pub fn is_complete(&self) -> bool {
        *lock(&self.0.done, "completion")
    }
    pub fn wait(&self) {
        let mut g = lock(&self.0.done, "completion");
        while !*g {
            g = wait(&self.0.cv, g, "completion");
        }
    }
    /// Waits at most `dur`; returns whether the flag is set.
    pub fn wait_timeout(&self, dur: Duration) -> bool {
        let deadline = match Instant::now().checked_add(dur) {
            Some(d) => d,
            None => {
                self.wait();
                return true;
            }
        };
        let mut g = lock(&self.0.done, "completion");
        while !*g {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            g = wait_timeout(&self.0.cv, g, deadline - now, "completion");
        }
        true
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

// --

#[cfg(test)]
mod tests {
    use {super::*, std::thread};

    #[test]
    fn completion_test1() {
        let c = Completion::new();
        assert!(!c.is_complete());
        assert!(!c.wait_timeout(Duration::from_millis(20)));
        let c2 = c.clone();
        let h = thread::spawn(move || c2.wait());
        thread::sleep(Duration::from_millis(20));
        c.complete();
        h.join().unwrap();
        assert!(c.is_complete());
        assert!(c.wait_timeout(Duration::from_secs(0)));
        c.wait();
        // a timeout past the end of the clock waits without a deadline
        assert!(c.wait_timeout(Duration::from_secs(u64::MAX)));
        c.reset();
        assert!(!c.is_complete());
        assert!(!c.wait_timeout(Duration::from_millis(1)));
    }
}
