//! In-flight aggregation state.
//!
//! Invariants:
//! - `current_key` is `None` only before the first record is folded
//! - every record before `index` is in `current_sum` or an emitted total

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of control-break progress.
///
/// Threaded through the engine by value; the checkpoint store holds the
/// durable copy between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationState {
    /// Key of the group being accumulated
    pub current_key: Option<String>,
    /// Partial total for `current_key`
    pub current_sum: i64,
    /// Position of the next record to fold (0-based)
    pub index: usize,
}

impl AggregationState {
    /// Zero state: nothing folded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any record has been folded into this state.
    pub fn has_progress(&self) -> bool {
        self.index > 0 || self.current_key.is_some()
    }
}

impl fmt::Display for AggregationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current_key {
            Some(key) => write!(
                f,
                "key={key} sum={} next_index={}",
                self.current_sum, self.index
            ),
            None => write!(f, "key=<none> sum={} next_index={}", self.current_sum, self.index),
        }
    }
}
