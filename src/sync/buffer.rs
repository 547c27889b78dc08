// -- buffer.rs --

use {
    super::{lock, wait, Arc, Condvar, Mutex},
    crate::{
        error::{Closed, SyncError, SyncResult},
        utilities::Ring,
    },
    log::{debug, trace},
};

// --

struct _State<T> {
    ring: Ring<T>,
    closed: bool,
}

struct _Buffer<T> {
    state: Mutex<_State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

/// Bounded multi-producer multi-consumer FIFO channel.
///
/// `enqueue` blocks while the buffer is full and `dequeue` blocks while it
/// is empty. After `close` consumers still drain the queued items and then
/// get `None`; producers get their item back as `Closed`.
pub struct BoundedBuffer<T>(Arc<_Buffer<T>>);

impl<T> Clone for BoundedBuffer<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> BoundedBuffer<T> {
    pub fn new(capacity: usize) -> SyncResult<Self> {
        if capacity == 0 {
            return Err(SyncError::InvalidCapacity(capacity));
        }
        Ok(Self(Arc::new(_Buffer {
            state: Mutex::new(_State {
                ring: Ring::new(capacity)?,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })))
    }
    pub fn enqueue(&self, item: T) -> Result<(), Closed<T>> {
        let mut g = lock(&self.0.state, "buffer");
        // notify_one releases "at least one" waiter, not necessarily this one
        while g.ring.is_full() && !g.closed {
            g = wait(&self.0.not_full, g, "buffer");
        }
        if g.closed {
            return Err(Closed(item));
        }
        if let Err(item) = g.ring.push(item) {
            return Err(Closed(item));
        }
        trace!("buffer: enqueued, {} queued", g.ring.len());
        self.0.not_empty.notify_one();
        Ok(())
    }
    pub fn dequeue(&self) -> Option<T> {
        let mut g = lock(&self.0.state, "buffer");
        while g.ring.is_empty() {
            if g.closed {
                // hand the termination on to the next blocked consumer
                self.0.not_empty.notify_one();
                return None;
            }
            g = wait(&self.0.not_empty, g, "buffer");
        }
        let item = g.ring.pop();
        trace!("buffer: dequeued, {} queued", g.ring.len());
        self.0.not_full.notify_one();
        item
    }
    pub fn close(&self) {
        let mut g = lock(&self.0.state, "buffer");
        if !g.closed {
            debug!("buffer: closed with {} queued", g.ring.len());
        }
        g.closed = true;
        self.0.not_empty.notify_all();
        self.0.not_full.notify_all();
    }
    pub fn is_closed(&self) -> bool {
        lock(&self.0.state, "buffer").closed
    }
    pub fn len(&self) -> usize {
        lock(&self.0.state, "buffer").ring.len()
    }
    pub fn is_empty(&self) -> bool {
        lock(&self.0.state, "buffer").ring.is_empty()
    }
    pub fn capacity(&self) -> usize {
        lock(&self.0.state, "buffer").ring.capacity()
    }
}

// --
