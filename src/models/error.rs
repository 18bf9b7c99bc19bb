//! Error types for ctlbreak.
//!
//! Taxonomy by where the failure surfaces:
//! - Before aggregation: configuration and input loading (fatal, no checkpoint)
//! - During aggregation: wrapped in `Aggregation` once progress is persisted
//! - Checkpoint integrity: distinct from "no checkpoint"

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for ctlbreak.
#[derive(Debug, Error)]
pub enum CtlBreakError {
    // ═══════════════════════════════════════════════════════════════════
    // BEFORE AGGREGATION — abort the run, never touch the checkpoint
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Input read error{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    InputRead { line: Option<u64>, message: String },

    // ═══════════════════════════════════════════════════════════════════
    // DURING AGGREGATION — state is persisted before this surfaces
    // ═══════════════════════════════════════════════════════════════════

    #[error("Aggregation failed at record {index}: {source}")]
    Aggregation {
        index: usize,
        #[source]
        source: Box<CtlBreakError>,
    },

    #[error("Sum for key '{key}' overflowed at record {index}")]
    Overflow { key: String, index: usize },

    // ═══════════════════════════════════════════════════════════════════
    // CHECKPOINT INTEGRITY — must not be mistaken for an absent checkpoint
    // ═══════════════════════════════════════════════════════════════════

    #[error("Checkpoint {path} is corrupt: {reason}")]
    CheckpointCorrupt { path: PathBuf, reason: String },

    // ═══════════════════════════════════════════════════════════════════
    // INFRASTRUCTURE
    // ═══════════════════════════════════════════════════════════════════

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CtlBreakError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an input read error, optionally tied to a 1-based line.
    pub fn input(line: Option<u64>, message: impl Into<String>) -> Self {
        Self::InputRead {
            line,
            message: message.into(),
        }
    }

    /// Create a checkpoint corruption error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CheckpointCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error that surfaced while aggregating at `index`.
    pub fn aggregation(index: usize, source: CtlBreakError) -> Self {
        Self::Aggregation {
            index,
            source: Box::new(source),
        }
    }

    /// Check if a re-run could recover from this error once the cause is fixed.
    ///
    /// Only aggregation failures leave a checkpoint behind to resume from.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Aggregation { .. })
    }
}

/// Result type alias for ctlbreak.
pub type Result<T> = std::result::Result<T, CtlBreakError>;
