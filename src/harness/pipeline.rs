// -- pipeline.rs --

use {
    crate::{
        config::PipelineConfig,
        error::{SyncError, SyncResult},
        sync::{BoundedBuffer, Completion},
    },
    log::{error, info},
    std::{
        thread,
        time::{Duration, Instant},
    },
};

// --

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub produced: usize,
    /// Items handled by each consumer.
    pub consumed: Vec<usize>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn total_consumed(&self) -> usize {
        self.consumed.iter().sum()
    }
    /// Consumed items per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_consumed() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Completes the handshake of an item when dropped, also when its consumer
/// unwinds or the item never leaves the buffer.
struct Ticket(Completion);

impl Drop for Ticket {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Closes and empties the buffer when a consumer unwinds, so that no
/// producer stays blocked on a full buffer or on an item nobody will take.
struct Unwind<'a, T>(&'a BoundedBuffer<T>);

impl<T> Drop for Unwind<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.close();
            while self.0.dequeue().is_some() {}
        }
    }
}

/// Producers and consumers connected by a `BoundedBuffer`.
///
/// Every item travels with a `Completion` that the consumer completes after
/// handling it; with `await_each` a producer blocks on it before producing
/// its next item. Once all producers are done the buffer is closed and the
/// consumers drain what is left.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> SyncResult<Self> {
        if config.capacity == 0 {
            return Err(SyncError::InvalidCapacity(config.capacity));
        }
        if config.producers == 0 || config.consumers == 0 {
            return Err(format!(
                "pipeline needs producers and consumers, got {} and {}",
                config.producers, config.consumers
            )
            .into());
        }
        Ok(Self { config })
    }

    /// `produce(producer, seq)` makes an item, `consume(consumer, item)`
    /// handles it.
    pub fn run<T, P, C>(&self, produce: P, consume: C) -> SyncResult<PipelineReport>
    where
        T: Send,
        P: Fn(usize, usize) -> T + Sync,
        C: Fn(usize, T) + Sync,
    {
        let buffer = BoundedBuffer::<(T, Ticket)>::new(self.config.capacity)?;
        let (produce, consume) = (&produce, &consume);
        let start = Instant::now();
        let mut failure = None;
        let mut produced = 0;
        let mut consumed = Vec::with_capacity(self.config.consumers);
        thread::scope(|s| {
            let mut consumers = Vec::with_capacity(self.config.consumers);
            for c in 0..self.config.consumers {
                let buffer = buffer.clone();
                let spawned = thread::Builder::new()
                    .name(format!("consumer-{}", c))
                    .spawn_scoped(s, move || {
                        let _unwind = Unwind(&buffer);
                        let mut n: usize = 0;
                        while let Some((item, ticket)) = buffer.dequeue() {
                            consume(c, item);
                            drop(ticket);
                            n += 1;
                        }
                        n
                    });
                match spawned {
                    Ok(h) => consumers.push(h),
                    Err(e) => {
                        error!("pipeline: spawning consumer {} failed: {}", c, e);
                        failure = Some(SyncError::Spawn(e.to_string()));
                        break;
                    }
                }
            }

            let mut producers = Vec::with_capacity(self.config.producers);
            for p in 0..self.config.producers {
                if failure.is_some() {
                    break;
                }
                let buffer = buffer.clone();
                let items = self.config.items_per_producer;
                let await_each = self.config.await_each;
                let spawned = thread::Builder::new()
                    .name(format!("producer-{}", p))
                    .spawn_scoped(s, move || -> SyncResult<usize> {
                        for seq in 0..items {
                            let done = Completion::new();
                            let ticket = Ticket(done.clone());
                            if buffer.enqueue((produce(p, seq), ticket)).is_err() {
                                return Err(format!("producer {}: buffer closed early", p).into());
                            }
                            if await_each {
                                done.wait();
                            }
                        }
                        Ok(items)
                    });
                match spawned {
                    Ok(h) => producers.push((p, h)),
                    Err(e) => {
                        error!("pipeline: spawning producer {} failed: {}", p, e);
                        failure = Some(SyncError::Spawn(e.to_string()));
                    }
                }
            }

            for (p, h) in producers {
                match h.join() {
                    Ok(Ok(n)) => produced += n,
                    Ok(Err(e)) => {
                        failure.get_or_insert(e);
                    }
                    Err(_) => {
                        failure.get_or_insert(SyncError::ActorPanicked(format!("producer-{}", p)));
                    }
                }
            }
            // every producer is done; consumers drain the rest and leave
            buffer.close();
            for (c, h) in consumers.into_iter().enumerate() {
                match h.join() {
                    Ok(n) => consumed.push(n),
                    Err(_) => {
                        error!("pipeline: consumer {} panicked", c);
                        // the panic is what closed the buffer under the producers
                        if !matches!(failure, Some(SyncError::ActorPanicked(_))) {
                            failure = Some(SyncError::ActorPanicked(format!("consumer-{}", c)));
                        }
                    }
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        let report = PipelineReport {
            produced,
            consumed,
            elapsed: start.elapsed(),
        };
        info!(
            "pipeline: {} items, {:.0} items/sec",
            report.total_consumed(),
            report.throughput()
        );
        Ok(report)
    }
}

// --

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::sync::Mutex,
        std::sync::mpsc::channel,
    };

    fn config(producers: usize, consumers: usize, await_each: bool) -> PipelineConfig {
        PipelineConfig {
            producers,
            consumers,
            items_per_producer: 50,
            capacity: 3,
            await_each,
        }
    }

    #[test]
    fn pipeline_delivers_every_item_once() {
        init_test_log!();
        for await_each in [false, true].iter() {
            let seen = Mutex::new(Vec::new());
            let report = Pipeline::new(config(3, 2, *await_each))
                .unwrap()
                .run(|p, seq| (p, seq), |_, item| seen.lock().unwrap().push(item))
                .unwrap();
            assert_eq!(150, report.produced);
            assert_eq!(150, report.total_consumed());
            assert_eq!(2, report.consumed.len());
            let mut seen = seen.into_inner().unwrap();
            seen.sort();
            let expect: Vec<_> = (0..3).flat_map(|p| (0..50).map(move |s| (p, s))).collect();
            assert_eq!(expect, seen);
        }
    }

    #[test]
    fn pipeline_keeps_per_producer_order() {
        let seen = Mutex::new(Vec::new());
        Pipeline::new(config(2, 1, false))
            .unwrap()
            .run(|p, seq| (p, seq), |_, item| seen.lock().unwrap().push(item))
            .unwrap();
        let seen = seen.into_inner().unwrap();
        for p in 0..2 {
            let seqs: Vec<_> = seen.iter().filter(|v| v.0 == p).map(|v| v.1).collect();
            assert_eq!((0..50).collect::<Vec<_>>(), seqs);
        }
    }

    #[test]
    fn pipeline_await_each_sees_consumer_writes() {
        // the producer reads what the consumer wrote once its item completes
        let slot = Mutex::new(None);
        let checked = Mutex::new(0);
        Pipeline::new(config(1, 1, true))
            .unwrap()
            .run(
                |_, seq| {
                    if seq > 0 {
                        assert_eq!(Some(seq - 1), *slot.lock().unwrap());
                        *checked.lock().unwrap() += 1;
                    }
                    seq
                },
                |_, seq| *slot.lock().unwrap() = Some(seq),
            )
            .unwrap();
        assert_eq!(49, checked.into_inner().unwrap());
    }

    #[test]
    fn pipeline_fails_when_consumer_panics() {
        for await_each in [false, true].iter() {
            let mut c = config(1, 1, *await_each);
            c.capacity = 2;
            c.items_per_producer = 10;
            let pipeline = Pipeline::new(c).unwrap();
            let (tx, rx) = channel();
            let h = thread::spawn(move || {
                let r = pipeline.run(
                    |_, seq| seq,
                    |_, seq| {
                        if seq == 0 {
                            panic!("consumer gave up on {}", seq);
                        }
                    },
                );
                tx.send(r).unwrap();
            });
            let r = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("pipeline hung after a consumer panic");
            assert_eq!(
                SyncError::ActorPanicked("consumer-0".to_string()),
                r.unwrap_err()
            );
            h.join().unwrap();
        }
    }

    #[test]
    fn pipeline_rejects_bad_config() {
        let mut c = config(1, 1, true);
        c.capacity = 0;
        assert_eq!(SyncError::InvalidCapacity(0), Pipeline::new(c).err().unwrap());
        assert!(Pipeline::new(config(0, 1, true)).is_err());
    }
}
