// -- fair.rs --

use {
    super::{check_actor, check_count, neighbors, Coordinator},
    crate::{
        error::{SyncError, SyncResult},
        sync::{lock, wait, Condvar, Mutex},
        utilities::Ring,
    },
    log::trace,
};

// --

struct _State {
    thinking: Vec<bool>,
    // actors that called acquire, in call order
    queue: Ring<usize>,
}

/// Predicate waiting plus a FIFO admission queue.
///
/// An actor may only proceed when it is at the front of the queue and both
/// neighbours are thinking, even if its neighbours are free earlier. Every
/// queued actor is thinking, so the front can only be blocked by actors
/// that are holding and not queued; they release and the front moves on.
/// Nobody is overtaken, at the cost of idle resources while the front
/// waits.
pub struct FairCoordinator {
    state: Mutex<_State>,
    turns: Vec<Condvar>,
}

impl FairCoordinator {
    pub fn new(count: usize) -> SyncResult<Self> {
        check_count(count)?;
        Ok(Self {
            state: Mutex::new(_State {
                thinking: vec![true; count],
                // an actor is queued at most once
                queue: Ring::new(count)?,
            }),
            turns: (0..count).map(|_| Condvar::new()).collect(),
        })
    }
    /// Waiting actors, front first.
    pub fn queued(&self) -> Vec<usize> {
        lock(&self.state, "fair").queue.to_vec()
    }
}

impl Coordinator for FairCoordinator {
    fn count(&self) -> usize {
        self.turns.len()
    }
    fn acquire(&self, id: usize) -> SyncResult<()> {
        let n = self.turns.len();
        check_actor(id, n)?;
        let (left, right) = neighbors(id, n);
        let mut g = lock(&self.state, "fair");
        if !g.thinking[id] || g.queue.iter().any(|v| *v == id) {
            return Err(SyncError::AlreadyActive(id));
        }
        if g.queue.push(id).is_err() {
            return Err(format!("fair: admission queue overflow at actor {}", id).into());
        }
        while g.queue.front() != Some(&id) || !g.thinking[left] || !g.thinking[right] {
            g = wait(&self.turns[id], g, "fair");
        }
        g.queue.pop();
        g.thinking[id] = false;
        if let Some(&next) = g.queue.front() {
            // the new front may already be free to go
            self.turns[next].notify_one();
        }
        trace!("fair: actor {} holding, {} queued", id, g.queue.len());
        Ok(())
    }
    fn release(&self, id: usize) -> SyncResult<()> {
        let n = self.turns.len();
        check_actor(id, n)?;
        let (left, right) = neighbors(id, n);
        let mut g = lock(&self.state, "fair");
        if g.thinking[id] {
            return Err(SyncError::NotHolding(id));
        }
        g.thinking[id] = true;
        self.turns[right].notify_one();
        self.turns[left].notify_one();
        Ok(())
    }
}

// --
