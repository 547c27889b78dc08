// -- mod.rs --

//! Strategies for N actors sitting in a ring, each needing both resources it
//! shares with its two neighbours before it can proceed.
//!
//! Actor `i` uses resources `i` and `(i + 1) % n`. Every strategy implements
//! [`Coordinator`]; they differ in how they avoid deadlock and in how fair
//! they are to individual actors.

use {
    crate::{
        error::{SyncError, SyncResult},
        sync::Arc,
    },
    log::warn,
    serde::{Deserialize, Serialize},
    std::fmt,
};

mod fair;
mod ordered;
mod predicate;
pub use fair::FairCoordinator;
pub use ordered::OrderedCoordinator;
pub use predicate::PredicateCoordinator;

// --

pub trait Coordinator: Send + Sync {
    /// Number of actors in the ring.
    fn count(&self) -> usize;
    /// Blocks until actor `id` holds both of its resources.
    fn acquire(&self, id: usize) -> SyncResult<()>;
    /// Gives back both resources of actor `id`.
    fn release(&self, id: usize) -> SyncResult<()>;
}

/// Per-actor lifecycle, `Thinking -> Waiting -> Holding -> Thinking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorState {
    Thinking,
    Waiting,
    Holding,
}

impl Default for ActorState {
    fn default() -> Self {
        Self::Thinking
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Odd and even actors take their forks in opposite order.
    Ordered,
    /// Wait until both neighbours are thinking.
    Predicate,
    /// Like `Predicate`, admitted in request order.
    Fair,
}

impl Strategy {
    pub fn build(self, count: usize) -> SyncResult<Arc<dyn Coordinator>> {
        let c: Arc<dyn Coordinator> = match self {
            Self::Ordered => Arc::new(OrderedCoordinator::new(count)?),
            Self::Predicate => Arc::new(PredicateCoordinator::new(count)?),
            Self::Fair => Arc::new(FairCoordinator::new(count)?),
        };
        Ok(c)
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Fair
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ordered => "ordered",
            Self::Predicate => "predicate",
            Self::Fair => "fair",
        };
        f.write_str(s)
    }
}

// --

pub(crate) fn check_count(count: usize) -> SyncResult<()> {
    if count < 2 {
        Err(SyncError::InvalidActorCount(count))
    } else {
        Ok(())
    }
}

pub(crate) fn check_actor(id: usize, count: usize) -> SyncResult<()> {
    if id >= count {
        Err(SyncError::InvalidActor { id, count })
    } else {
        Ok(())
    }
}

/// Ring neighbours of `id` as `(left, right)`.
#[inline]
pub(crate) fn neighbors(id: usize, count: usize) -> (usize, usize) {
    ((id + count - 1) % count, (id + 1) % count)
}

// --

/// Holds the resources of one actor until dropped.
pub struct Seat<'a> {
    coordinator: &'a dyn Coordinator,
    id: usize,
    released: bool,
}

/// Acquires the resources of `id`, releasing them when the returned seat is
/// dropped.
pub fn seat(coordinator: &dyn Coordinator, id: usize) -> SyncResult<Seat<'_>> {
    coordinator.acquire(id)?;
    Ok(Seat {
        coordinator,
        id,
        released: false,
    })
}

impl Seat<'_> {
    pub fn id(&self) -> usize {
        self.id
    }
    pub fn leave(mut self) -> SyncResult<()> {
        self.released = true;
        self.coordinator.release(self.id)
    }
}

impl Drop for Seat<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.coordinator.release(self.id) {
                warn!("seat {}: release failed: {}", self.id, e);
            }
        }
    }
}

// --

#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::sync::Mutex,
        rand::Rng,
        std::{
            sync::mpsc::channel,
            thread,
            time::Duration,
        },
    };

    /// Records which actors currently hold their resources and panics when
    /// two ring-adjacent actors hold at the same time.
    pub(crate) struct Monitor {
        holding: Mutex<Vec<bool>>,
    }

    impl Monitor {
        pub(crate) fn new(count: usize) -> Self {
            Self {
                holding: Mutex::new(vec![false; count]),
            }
        }
        pub(crate) fn enter(&self, id: usize) {
            let mut g = self.holding.lock().unwrap();
            let n = g.len();
            let (left, right) = neighbors(id, n);
            assert!(!g[id], "actor {} entered twice", id);
            assert!(!g[left] && !g[right], "actor {} overlaps a neighbour: {:?}", id, *g);
            g[id] = true;
        }
        pub(crate) fn leave(&self, id: usize) {
            self.holding.lock().unwrap()[id] = false;
        }
    }

    /// Runs every actor through `rounds` cycles with small random delays,
    /// checking adjacent actors never hold together, and fails if the whole
    /// run does not finish within `budget`.
    pub(crate) fn stress(
        coordinator: Arc<dyn Coordinator>,
        rounds: usize,
        budget: Duration,
    ) {
        let count = coordinator.count();
        let monitor = Arc::new(Monitor::new(count));
        let (tx, rx) = channel();
        for id in 0..count {
            let (c, m, tx) = (coordinator.clone(), monitor.clone(), tx.clone());
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..rounds {
                    if rng.gen_bool(0.5) {
                        thread::sleep(Duration::from_micros(rng.gen_range(0, 50)));
                    }
                    c.acquire(id).unwrap();
                    m.enter(id);
                    if rng.gen_bool(0.5) {
                        thread::sleep(Duration::from_micros(rng.gen_range(0, 50)));
                    }
                    m.leave(id);
                    c.release(id).unwrap();
                }
                tx.send(id).unwrap();
            });
        }
        drop(tx);
        for _ in 0..count {
            rx.recv_timeout(budget).expect("actors made no progress in time");
        }
    }

    #[test]
    fn strategy_builds_each_variant() {
        for s in [Strategy::Ordered, Strategy::Predicate, Strategy::Fair].iter() {
            let c = s.build(3).unwrap();
            assert_eq!(3, c.count());
            c.acquire(0).unwrap();
            c.release(0).unwrap();
            assert_eq!(
                SyncError::InvalidActorCount(1),
                s.build(1).err().unwrap()
            );
        }
        assert_eq!("\"predicate\"", serde_json::to_string(&Strategy::Predicate).unwrap());
        assert_eq!(Strategy::Ordered, serde_json::from_str::<Strategy>("\"ordered\"").unwrap());
    }

    #[test]
    fn neighbors_wrap() {
        assert_eq!((4, 1), neighbors(0, 5));
        assert_eq!((3, 0), neighbors(4, 5));
        assert_eq!((1, 1), neighbors(0, 2));
    }

    #[test]
    fn seat_releases_on_drop() {
        let c = PredicateCoordinator::new(3).unwrap();
        {
            let s = seat(&c, 1).unwrap();
            assert_eq!(1, s.id());
            assert_eq!(SyncError::AlreadyActive(1), c.acquire(1).unwrap_err());
        }
        c.acquire(1).unwrap();
        c.release(1).unwrap();
        let s = seat(&c, 2).unwrap();
        s.leave().unwrap();
        assert_eq!(SyncError::NotHolding(2), c.release(2).unwrap_err());
    }
}
