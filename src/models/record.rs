//! Records flowing in, totals flowing out, and per-run statistics.

use serde::{Deserialize, Serialize};

/// A single input record.
///
/// Records are produced by a source in a significant order; runs of equal
/// keys are expected to be contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: i64,
}

impl Record {
    pub fn new(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Total for one contiguous run of a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub key: String,
    pub total: i64,
}

impl ResultEntry {
    pub fn new(key: impl Into<String>, total: i64) -> Self {
        Self {
            key: key.into(),
            total,
        }
    }
}

/// Statistics for a completed batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Records in the input
    pub total_records: usize,

    /// Index the run started from (non-zero when resumed)
    pub resumed_from: usize,

    /// Records folded during this run
    pub records_processed: usize,

    /// Result entries written to the sink
    pub groups_emitted: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Records per second throughput
    pub throughput_per_sec: f64,
}

impl RunStats {
    /// Whether this run picked up from a checkpoint.
    pub fn resumed(&self) -> bool {
        self.resumed_from > 0
    }

    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.runtime_secs > 0.0 {
            self.throughput_per_sec = self.records_processed as f64 / self.runtime_secs;
        }
    }
}
