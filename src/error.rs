// -- error.rs --

use std::{error::Error, fmt};

// --

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    InvalidActorCount(usize),
    InvalidActor { id: usize, count: usize },
    InvalidCapacity(usize),
    NotHolding(usize),
    AlreadyActive(usize),
    Spawn(String),
    ActorPanicked(String),
    Other(String),
}

impl Error for SyncError {}

impl<T: Into<String>> std::convert::From<T> for SyncError {
    fn from(e: T) -> Self {
        Self::Other(e.into())
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidActorCount(n) => write!(f, "at least 2 actors are required, got {}", n),
            Self::InvalidActor { id, count } => {
                write!(f, "actor {} is out of range for {} actors", id, count)
            }
            Self::InvalidCapacity(c) => write!(f, "capacity must be positive, got {}", c),
            Self::NotHolding(id) => write!(f, "actor {} released resources it does not hold", id),
            Self::AlreadyActive(id) => write!(f, "actor {} is already holding or waiting", id),
            _ => write!(f, "SyncError({:?})", self),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

// --

/// The item handed back by `BoundedBuffer::enqueue` once the buffer is closed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Closed<T>(pub T);

impl<T> Closed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closed(..)")
    }
}

impl<T> fmt::Display for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("enqueue on a closed buffer")
    }
}

impl<T> Error for Closed<T> {}
