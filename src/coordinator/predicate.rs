// -- predicate.rs --

use {
    super::{check_actor, check_count, neighbors, Coordinator},
    crate::{
        error::{SyncError, SyncResult},
        sync::{lock, wait, Condvar, Mutex},
    },
    log::trace,
};

// --

/// Lets an actor proceed only while both ring neighbours are thinking.
///
/// All predicate checks run under one mutex; each actor waits on its own
/// condvar so a release can wake exactly the two neighbours whose
/// predicate may have changed. Two adjacent actors never hold at the same
/// time, and an actor only ever blocks on a neighbour that is holding and
/// will release, so the ring cannot deadlock. No admission order is
/// imposed: who goes next is up to the scheduler.
pub struct PredicateCoordinator {
    thinking: Mutex<Vec<bool>>,
    turns: Vec<Condvar>,
}

impl PredicateCoordinator {
    pub fn new(count: usize) -> SyncResult<Self> {
        check_count(count)?;
        Ok(Self {
            thinking: Mutex::new(vec![true; count]),
            turns: (0..count).map(|_| Condvar::new()).collect(),
        })
    }
}

impl Coordinator for PredicateCoordinator {
    fn count(&self) -> usize {
        self.turns.len()
    }
    fn acquire(&self, id: usize) -> SyncResult<()> {
        let n = self.turns.len();
        check_actor(id, n)?;
        let (left, right) = neighbors(id, n);
        let mut g = lock(&self.thinking, "predicate");
        if !g[id] {
            return Err(SyncError::AlreadyActive(id));
        }
        while !g[left] || !g[right] {
            g = wait(&self.turns[id], g, "predicate");
        }
        g[id] = false;
        trace!("predicate: actor {} holding", id);
        Ok(())
    }
    fn release(&self, id: usize) -> SyncResult<()> {
        let n = self.turns.len();
        check_actor(id, n)?;
        let (left, right) = neighbors(id, n);
        let mut g = lock(&self.thinking, "predicate");
        if g[id] {
            return Err(SyncError::NotHolding(id));
        }
        g[id] = true;
        self.turns[right].notify_one();
        self.turns[left].notify_one();
        Ok(())
    }
}

// --
