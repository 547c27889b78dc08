// -- table.rs --

use {
    crate::{
        config::TableConfig,
        coordinator::{neighbors, ActorState, Coordinator, OrderedCoordinator, Strategy},
        error::{SyncError, SyncResult},
        sync::{lock, Arc, Completion, Mutex},
    },
    log::{debug, error, info, trace},
    rand::{rngs::StdRng, Rng, SeedableRng},
    std::{
        fmt,
        thread,
        time::{Duration, Instant},
    },
};

// --

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub elapsed: Duration,
    pub states: Vec<ActorState>,
    /// Time each actor spent blocked in `acquire`.
    pub block_times: Vec<Duration>,
    pub meals: Vec<u64>,
}

impl Report {
    pub fn total_block_time(&self) -> Duration {
        self.block_times.iter().sum()
    }
    pub fn total_meals(&self) -> u64 {
        self.meals.iter().sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6}ms Total blocktime: {:>7}ms :",
            self.elapsed.as_millis(),
            self.total_block_time().as_millis()
        )?;
        for b in self.block_times.iter() {
            write!(f, " {:>5}", b.as_millis())?;
        }
        Ok(())
    }
}

struct _Stats {
    started: Instant,
    states: Vec<ActorState>,
    block_times: Vec<Duration>,
    meals: Vec<u64>,
}

impl _Stats {
    fn new(count: usize) -> Self {
        Self {
            started: Instant::now(),
            states: vec![ActorState::Thinking; count],
            block_times: vec![Duration::from_secs(0); count],
            meals: vec![0; count],
        }
    }
    fn report(&self) -> Report {
        Report {
            elapsed: self.started.elapsed(),
            states: self.states.clone(),
            block_times: self.block_times.clone(),
            meals: self.meals.clone(),
        }
    }
}

// --

/// Runs one thread per actor through think, acquire, eat, release cycles
/// on a shared coordinator and keeps per-actor statistics.
pub struct Table {
    config: TableConfig,
    coordinator: Arc<dyn Coordinator>,
    stop: Completion,
    stats: Mutex<_Stats>,
}

impl Table {
    /// The number of actors is taken from `coordinator`.
    pub fn new(config: TableConfig, coordinator: Arc<dyn Coordinator>) -> Self {
        let count = coordinator.count();
        Self {
            config,
            coordinator,
            stop: Completion::new(),
            stats: Mutex::new(_Stats::new(count)),
        }
    }
    pub fn from_config(config: TableConfig) -> SyncResult<Self> {
        let coordinator: Arc<dyn Coordinator> = match config.strategy {
            Strategy::Ordered if config.interlock_ms > 0 => Arc::new(
                OrderedCoordinator::with_interlock(
                    config.actors,
                    Duration::from_millis(config.interlock_ms),
                )?,
            ),
            s => s.build(config.actors)?,
        };
        Ok(Self::new(config, coordinator))
    }
    /// Handle that ends `run` once completed; actors finish their current
    /// meal and give their resources back first. Each `run` starts with the
    /// signal cleared, so a table can be run again after being stopped.
    pub fn stopper(&self) -> Completion {
        self.stop.clone()
    }
    pub fn stop(&self) {
        self.stop.complete();
    }
    pub fn snapshot(&self) -> Report {
        lock(&self.stats, "table").report()
    }
    pub fn run(&self) -> SyncResult<Report> {
        let count = self.coordinator.count();
        *lock(&self.stats, "table") = _Stats::new(count);
        self.stop.reset();
        info!(
            "table: {} actors, strategy {}, rounds {:?}",
            count, self.config.strategy, self.config.rounds
        );
        let mut failure = None;
        thread::scope(|s| {
            let mut handles = Vec::with_capacity(count);
            for id in 0..count {
                let spawned = thread::Builder::new()
                    .name(format!("actor-{}", id))
                    .spawn_scoped(s, move || self.dine(id));
                match spawned {
                    Ok(h) => handles.push((id, h)),
                    Err(e) => {
                        error!("table: spawning actor {} failed: {}", id, e);
                        self.stop.complete();
                        failure = Some(SyncError::Spawn(e.to_string()));
                        break;
                    }
                }
            }
            for (id, h) in handles {
                let r = match h.join() {
                    Ok(r) => r,
                    Err(_) => Err(SyncError::ActorPanicked(format!("actor-{}", id))),
                };
                if let Err(e) = r {
                    failure.get_or_insert(e);
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        let report = self.snapshot();
        info!("table: {}", report);
        Ok(report)
    }

    fn dine(&self, id: usize) -> SyncResult<()> {
        let r = self.dine_rounds(id);
        if let Err(ref e) = r {
            error!("actor {}: {}", id, e);
            self.stop.complete();
        }
        r
    }

    fn dine_rounds(&self, id: usize) -> SyncResult<()> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => StdRng::from_entropy(),
        };
        let mut round = 0;
        while self.config.rounds.map_or(true, |r| round < r) {
            let think = pause(&mut rng, self.config.max_think_ms);
            trace!("actor {}: thinking for {:?}", id, think);
            if self.stop.wait_timeout(think) {
                break;
            }
            self.set_state(id, ActorState::Waiting)?;
            let t = Instant::now();
            self.coordinator.acquire(id)?;
            let blocked = t.elapsed();
            {
                let mut g = lock(&self.stats, "table");
                g.block_times[id] += blocked;
                g.meals[id] += 1;
            }
            if let Err(e) = self.set_state(id, ActorState::Holding) {
                self.coordinator.release(id)?;
                return Err(e);
            }
            let eat = pause(&mut rng, self.config.max_eat_ms);
            trace!("actor {}: eating for {:?}", id, eat);
            let stopped = self.stop.wait_timeout(eat);
            self.set_state(id, ActorState::Thinking)?;
            self.coordinator.release(id)?;
            round += 1;
            if stopped {
                break;
            }
        }
        debug!("actor {}: left after {} meals", id, round);
        Ok(())
    }

    // The recorded holding interval lies inside the real one, so an overlap
    // seen here is a real one.
    fn set_state(&self, id: usize, state: ActorState) -> SyncResult<()> {
        let mut g = lock(&self.stats, "table");
        if state == ActorState::Holding {
            let (left, right) = neighbors(id, g.states.len());
            for other in [left, right].iter() {
                if g.states[*other] == ActorState::Holding {
                    return Err(format!("actors {} and {} hold a shared resource", id, other).into());
                }
            }
        }
        g.states[id] = state;
        Ok(())
    }
}

/// Random pause of `0..=max_ms` milliseconds.
fn pause(rng: &mut StdRng, max_ms: u64) -> Duration {
    let ms = match max_ms.checked_add(1) {
        Some(high) => rng.gen_range(0, high),
        None => rng.gen(),
    };
    Duration::from_millis(ms)
}

// --
