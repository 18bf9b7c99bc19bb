//! Result sinks.

use crate::checkpoint::AtomicWrite;
use crate::models::{CtlBreakError, Result, ResultEntry};
use csv::WriterBuilder;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives the complete, ordered result list of a successful run.
///
/// Called at most once per run, and only after every record was folded.
pub trait ResultSink {
    fn write(&mut self, results: &[ResultEntry]) -> Result<()>;
}

impl ResultSink for Vec<ResultEntry> {
    fn write(&mut self, results: &[ResultEntry]) -> Result<()> {
        self.clear();
        self.extend_from_slice(results);
        Ok(())
    }
}

/// Headerless `key,total` CSV file, replaced atomically.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn write(&mut self, results: &[ResultEntry]) -> Result<()> {
        let mut tx = AtomicWrite::begin(&self.path)?;

        {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_writer(tx.writer());
            for entry in results {
                writer
                    .serialize(entry)
                    .map_err(|e| CtlBreakError::io("writing results", e.into()))?;
            }
            writer
                .flush()
                .map_err(|e| CtlBreakError::io("flushing results", e))?;
        }

        tx.commit()?;

        info!(count = results.len(), path = %self.path.display(), "Results written");
        Ok(())
    }
}
