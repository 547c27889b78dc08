// -- ring.rs --

use {
    crate::error::{SyncError, SyncResult},
    std::fmt,
};

// --

/// Fixed-capacity FIFO over `capacity + 1` slots.
///
/// One slot always stays unused so that `head == tail` means empty and
/// `tail + 1 == head` (modulo the slot count) means full, without keeping a
/// separate element count. `head` points at the slot before the front
/// element; pushes go to `tail + 1`.
pub struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> SyncResult<Self> {
        let n = capacity
            .checked_add(1)
            .ok_or(SyncError::InvalidCapacity(capacity))?;
        let mut slots = Vec::with_capacity(n);
        slots.resize_with(n, || None);
        Ok(Self {
            slots,
            head: 0,
            tail: 0,
        })
    }
    #[inline]
    fn next(&self, i: usize) -> usize {
        (i + 1) % self.slots.len()
    }
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }
    pub fn len(&self) -> usize {
        (self.tail + self.slots.len() - self.head) % self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }
    pub fn is_full(&self) -> bool {
        self.next(self.tail) == self.head
    }
    /// Appends at the back, handing the item back when full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let next = self.next(self.tail);
        self.slots[next] = Some(item);
        self.tail = next;
        Ok(())
    }
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let next = self.next(self.head);
        self.head = next;
        self.slots[next].take()
    }
    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.next(self.head)].as_ref()
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let n = self.slots.len();
        (1..=self.len()).filter_map(move |k| self.slots[(self.head + k) % n].as_ref())
    }
}

impl<T: Clone> Ring<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.len(), self.capacity())?;
        for v in self.iter() {
            write!(f, "-{:?}", v)?;
        }
        Ok(())
    }
}

// --
