// -- lib.rs --

//! Blocking coordination primitives built on `std::sync::{Mutex, Condvar}`:
//! a counting semaphore, a bounded producer/consumer buffer, and three
//! strategies for the dining philosophers ring.

#[macro_use]
mod macros;

extern crate log;
extern crate serde;

// --

mod error;
mod utilities;

pub mod coordinator;
pub mod sync;

pub use crate::{
    coordinator::{seat, ActorState, Coordinator, Seat, Strategy},
    error::{Closed, SyncError, SyncResult},
    sync::{BoundedBuffer, Completion, Semaphore, SemaphoreGuard},
    utilities::Ring,
};

// --

cfg_harness! {
    extern crate rand;
    extern crate serde_json;

    mod config;
    pub mod harness;

    pub use crate::{
        config::{Config, PipelineConfig, TableConfig},
        harness::{Pipeline, PipelineReport, Report, Table},
    };
}
