//! Aggregation engine.
//!
//! A pure function of `(records, initial state)`: performs no I/O and owns
//! no durable state. Persistence decisions belong to the caller.

mod control_break;

pub use control_break::*;
