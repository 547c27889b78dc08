// -- ordered.rs --

use {
    super::{check_actor, check_count, Coordinator},
    crate::{
        error::{SyncError, SyncResult},
        sync::{lock, wait, Condvar, Mutex},
    },
    log::trace,
    std::{thread, time::Duration},
};

// --

/// A single shared resource; blocks until its holder puts it down.
#[cfg_attr(test, derive(Debug))]
struct Fork {
    holder: Mutex<Option<usize>>,
    cv: Condvar,
}

impl Fork {
    fn new() -> Self {
        Self {
            holder: Mutex::new(None),
            cv: Condvar::new(),
        }
    }
    /// Fails instead of waiting when `id` already holds the fork.
    fn take(&self, id: usize) -> SyncResult<()> {
        let mut g = lock(&self.holder, "fork");
        while let Some(holder) = *g {
            if holder == id {
                return Err(SyncError::AlreadyActive(id));
            }
            g = wait(&self.cv, g, "fork");
        }
        *g = Some(id);
        Ok(())
    }
    fn put(&self, id: usize) -> SyncResult<()> {
        let mut g = lock(&self.holder, "fork");
        if *g != Some(id) {
            return Err(SyncError::NotHolding(id));
        }
        *g = None;
        // a second acquire of the same actor may be waiting beside the taker
        self.cv.notify_all();
        Ok(())
    }
    fn held_by(&self, id: usize) -> bool {
        *lock(&self.holder, "fork") == Some(id)
    }
}

// --

/// Breaks the circular wait by ordering fork acquisition.
///
/// Odd actors take fork `id` and then `id + 1`, even actors take `id + 1`
/// and then `id`. Going around the ring at least one actor's first fork is
/// only ever someone else's second fork, so the wait-for chain cannot close
/// into a cycle and the ring cannot deadlock for any `n > 1`.
///
/// This is not fair: the actor whose first fork is its neighbour's second
/// fork blocks for noticeably less time than everyone else.
pub struct OrderedCoordinator {
    forks: Vec<Fork>,
    interlock: Option<Duration>,
}

impl OrderedCoordinator {
    pub fn new(count: usize) -> SyncResult<Self> {
        check_count(count)?;
        Ok(Self {
            forks: (0..count).map(|_| Fork::new()).collect(),
            interlock: None,
        })
    }
    /// Sleeps `delay` between taking the first and the second fork, which
    /// makes preemption while half-seated much more likely.
    pub fn with_interlock(count: usize, delay: Duration) -> SyncResult<Self> {
        let mut c = Self::new(count)?;
        c.interlock = Some(delay);
        Ok(c)
    }
    /// Forks of `id` in the order they are taken.
    fn order(&self, id: usize) -> (usize, usize) {
        let (left, right) = (id, (id + 1) % self.forks.len());
        if id & 1 == 1 {
            (left, right)
        } else {
            (right, left)
        }
    }
}

impl Coordinator for OrderedCoordinator {
    fn count(&self) -> usize {
        self.forks.len()
    }
    fn acquire(&self, id: usize) -> SyncResult<()> {
        check_actor(id, self.forks.len())?;
        let (first, second) = self.order(id);
        self.forks[first].take(id)?;
        if let Some(d) = self.interlock {
            thread::sleep(d);
        }
        if let Err(e) = self.forks[second].take(id) {
            self.forks[first].put(id)?;
            return Err(e);
        }
        trace!("ordered: actor {} took forks {} and {}", id, first, second);
        Ok(())
    }
    fn release(&self, id: usize) -> SyncResult<()> {
        check_actor(id, self.forks.len())?;
        let (first, second) = self.order(id);
        if !self.forks[first].held_by(id) {
            return Err(SyncError::NotHolding(id));
        }
        self.forks[second].put(id)?;
        self.forks[first].put(id)
    }
}

// --

#[cfg(test)]
mod tests {
    use {
        super::{super::tests::stress, *},
        crate::sync::Arc,
        std::sync::mpsc::channel,
    };

    #[test]
    fn ordered_takes_forks_in_parity_order() {
        let c = OrderedCoordinator::new(5).unwrap();
        assert_eq!((1, 2), c.order(1));
        assert_eq!((1, 0), c.order(0));
        assert_eq!((0, 4), c.order(4));
        let c = OrderedCoordinator::new(2).unwrap();
        // both actors start with fork 1
        assert_eq!((1, 0), c.order(0));
        assert_eq!((1, 0), c.order(1));
    }

    #[test]
    fn ordered_reports_misuse() {
        let c = OrderedCoordinator::new(3).unwrap();
        assert_eq!(SyncError::NotHolding(0), c.release(0).unwrap_err());
        assert_eq!(
            SyncError::InvalidActor { id: 3, count: 3 },
            c.acquire(3).unwrap_err()
        );
        c.acquire(0).unwrap();
        assert_eq!(SyncError::AlreadyActive(0), c.acquire(0).unwrap_err());
        assert_eq!(SyncError::NotHolding(1), c.release(1).unwrap_err());
        c.release(0).unwrap();
        assert_eq!(
            SyncError::InvalidActorCount(0),
            OrderedCoordinator::new(0).err().unwrap()
        );
    }

    #[test]
    fn ordered_rejects_concurrent_double_acquire() {
        let c = Arc::new(OrderedCoordinator::new(3).unwrap());
        // 1 holds fork 1, the first fork of actor 0
        c.acquire(1).unwrap();
        let (tx, rx) = channel();
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let (c, tx) = (c.clone(), tx.clone());
                thread::spawn(move || tx.send(c.acquire(0)).unwrap())
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        c.release(1).unwrap();
        let mut got = vec![
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        got.sort_by_key(|r| r.is_err());
        assert_eq!(vec![Ok(()), Err(SyncError::AlreadyActive(0))], got);
        for h in handles {
            h.join().unwrap();
        }
        c.release(0).unwrap();
        assert_eq!(SyncError::NotHolding(0), c.release(0).unwrap_err());
    }

    #[test]
    fn ordered_never_deadlocks() {
        init_test_log!();
        for n in 2..=6 {
            let c: Arc<dyn Coordinator> = Arc::new(OrderedCoordinator::new(n).unwrap());
            stress(c, 1000, Duration::from_secs(60));
        }
    }

    #[test]
    fn ordered_survives_interlock_delay() {
        let c: Arc<dyn Coordinator> =
            Arc::new(OrderedCoordinator::with_interlock(5, Duration::from_micros(200)).unwrap());
        stress(c, 200, Duration::from_secs(60));
    }
}
