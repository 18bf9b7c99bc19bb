//! Checkpoint module for resumable aggregation.
//!
//! Provides:
//! - `AggregationState`: control-break progress threaded through the engine
//! - `CheckpointStore`: versioned persistence of that state between runs
//! - `AtomicWrite`: write-then-rename replacement shared with the result sink

mod atomic;
mod state;
mod store;

pub use atomic::{atomic_write, AtomicWrite};
pub use state::*;
pub use store::*;
