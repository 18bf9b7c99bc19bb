//! Durable storage of `AggregationState` between runs.
//!
//! The file is a versioned JSON envelope:
//!
//! ```json
//! {
//!   "format": "ctlbreak-checkpoint",
//!   "version": 1,
//!   "saved_at": "2024-01-01T00:00:00Z",
//!   "state": { "current_key": "B", "current_sum": 15, "index": 4 }
//! }
//! ```
//!
//! Anything that does not match this shape exactly is reported as
//! `CheckpointCorrupt`, never as an absent checkpoint.

use super::atomic::{atomic_write, orphan_pattern, remove_if_exists};
use super::AggregationState;
use crate::models::{CtlBreakError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Identifies a checkpoint written by this crate.
pub const CHECKPOINT_FORMAT: &str = "ctlbreak-checkpoint";

/// Current envelope version. Bump when the state layout changes.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckpointFile {
    format: String,
    version: u32,
    saved_at: DateTime<Utc>,
    state: AggregationState,
}

/// Persists, loads and clears the checkpoint at a single path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store for the checkpoint at `path`. Touches nothing on disk.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Location of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a checkpoint file is present (valid or not).
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the persisted state.
    ///
    /// Returns `Ok(None)` when no checkpoint exists. A file that exists but
    /// does not decode is `CheckpointCorrupt`.
    pub fn load(&self) -> Result<Option<AggregationState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint found");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(CtlBreakError::corrupt(&self.path, "not valid UTF-8"));
            }
            Err(e) => return Err(CtlBreakError::io("reading checkpoint", e)),
        };

        let state = self.decode(&content)?;
        info!(path = %self.path.display(), %state, "Loaded checkpoint");
        Ok(Some(state))
    }

    /// Persist `state`, fully replacing any previous checkpoint.
    pub fn save(&self, state: &AggregationState) -> Result<()> {
        let file = CheckpointFile {
            format: CHECKPOINT_FORMAT.to_string(),
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            state: state.clone(),
        };

        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| CtlBreakError::Internal(format!("Serializing checkpoint: {e}")))?;

        atomic_write(&self.path, content.as_bytes())?;

        info!(path = %self.path.display(), %state, "Checkpoint saved");
        Ok(())
    }

    /// Remove the checkpoint and any temp files orphaned by an interrupted save.
    ///
    /// Succeeds when nothing exists. The file is not parsed, so this also
    /// discards a corrupt checkpoint.
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)?;

        let pattern = orphan_pattern(&self.path);
        let orphans = glob::glob(&pattern)
            .map_err(|e| CtlBreakError::Internal(format!("Invalid glob pattern: {e}")))?
            .filter_map(|r| r.ok());

        for orphan in orphans {
            warn!(path = %orphan.display(), "Removing orphaned checkpoint temp file");
            remove_if_exists(&orphan)?;
        }

        debug!(path = %self.path.display(), "Checkpoint cleared");
        Ok(())
    }

    fn decode(&self, content: &str) -> Result<AggregationState> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| CtlBreakError::corrupt(&self.path, format!("invalid JSON: {e}")))?;

        // Check identity and version first so an incompatible file is
        // reported as such rather than as a field mismatch.
        let format = value.get("format").and_then(|v| v.as_str());
        if format != Some(CHECKPOINT_FORMAT) {
            return Err(CtlBreakError::corrupt(
                &self.path,
                format!("unrecognized format {format:?}, expected {CHECKPOINT_FORMAT:?}"),
            ));
        }

        match value.get("version").and_then(|v| v.as_u64()) {
            Some(v) if v == u64::from(CHECKPOINT_VERSION) => {}
            Some(v) => {
                return Err(CtlBreakError::corrupt(
                    &self.path,
                    format!("unsupported version {v}, supported {CHECKPOINT_VERSION}"),
                ));
            }
            None => return Err(CtlBreakError::corrupt(&self.path, "missing version")),
        }

        let file: CheckpointFile = serde_json::from_value(value)
            .map_err(|e| CtlBreakError::corrupt(&self.path, format!("invalid layout: {e}")))?;

        debug!(saved_at = %file.saved_at, "Decoded checkpoint envelope");
        Ok(file.state)
    }
}
