//! ctlbreak - Resumable control-break aggregation of ordered key/value records.
//!
//! ## Architecture
//!
//! - **Engine**: folds records into per-key totals, one total per contiguous
//!   run of a key
//! - **Checkpoint**: persists in-flight state so a crashed run resumes without
//!   reprocessing or double-counting
//! - **Pipeline**: wires source, engine, sink and checkpoint for one run
//!
//! ## Failure model
//!
//! - Configuration and input errors abort before any state is touched
//! - Errors during aggregation persist the exact in-flight state, then stop
//! - Results reach the sink only after a clean pass, in a single batch
//! - A corrupt checkpoint is an error, never an implicit fresh start

pub mod checkpoint;
pub mod engine;
pub mod io;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use checkpoint::{AggregationState, CheckpointStore};
pub use engine::RunOutcome;
pub use io::{CsvSink, CsvSource, RecordSource, ResultSink};
pub use models::{Config, CtlBreakError, Record, Result, ResultEntry, RunStats};
pub use pipeline::BatchRunner;
