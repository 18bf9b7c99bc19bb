//! Batch runner: load checkpoint → aggregate → commit results or persist state.
//!
//! Pipeline flow:
//! Checkpoint → Source → Engine → Sink → clear Checkpoint
//!
//! Any failure once aggregation has started leaves a checkpoint behind; the
//! operator re-runs the process to resume. Nothing is retried automatically.

use crate::checkpoint::{AggregationState, CheckpointStore};
use crate::engine::{self, RunOutcome};
use crate::io::{CsvSink, CsvSource, RecordSource, ResultSink};
use crate::models::{Config, CtlBreakError, Result, RunStats};
use std::time::Instant;
use tracing::{error, info, warn};

/// Drives one resumable aggregation run.
pub struct BatchRunner<S, K> {
    source: S,
    sink: K,
    store: CheckpointStore,
}

impl BatchRunner<CsvSource, CsvSink> {
    /// Wire CSV input/output and the checkpoint file named in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CsvSource::new(&config.input_file),
            CsvSink::new(&config.output_file),
            CheckpointStore::new(&config.state_file),
        )
    }
}

impl<S: RecordSource, K: ResultSink> BatchRunner<S, K> {
    pub fn new(source: S, sink: K, store: CheckpointStore) -> Self {
        Self {
            source,
            sink,
            store,
        }
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run to completion, or persist progress and return the failure.
    ///
    /// Errors before aggregation (corrupt checkpoint, unreadable input) leave
    /// the checkpoint exactly as found.
    pub fn run(&mut self) -> Result<RunStats> {
        let start = Instant::now();

        let state = match self.store.load()? {
            Some(state) => {
                info!(%state, "Resuming from checkpoint");
                state
            }
            None => AggregationState::new(),
        };

        let records = self.source.load()?;
        let total_records = records.len();

        if state.index > total_records {
            return Err(CtlBreakError::corrupt(
                self.store.path(),
                format!(
                    "resume index {} is past the end of the input ({total_records} records)",
                    state.index
                ),
            ));
        }

        let resumed_from = state.index;
        info!(
            total_records,
            resumed_from,
            pending = total_records - resumed_from,
            "Starting batch"
        );

        let outcome = engine::run(records.into_iter().map(Ok::<_, CtlBreakError>), state);

        let (results, state) = match outcome {
            RunOutcome::Completed { results, state } => (results, state),
            RunOutcome::Failed { state, error } => {
                self.persist(&state);
                return Err(error);
            }
        };

        if let Err(e) = self.sink.write(&results) {
            error!(error = %e, "Writing results failed");
            self.persist(&state);
            return Err(CtlBreakError::aggregation(state.index, e));
        }

        self.store.clear()?;

        let mut stats = RunStats {
            total_records,
            resumed_from,
            records_processed: total_records - resumed_from,
            groups_emitted: results.len(),
            runtime_secs: start.elapsed().as_secs_f64(),
            ..Default::default()
        };
        stats.finalize();

        info!(
            groups = stats.groups_emitted,
            processed = stats.records_processed,
            resumed = stats.resumed(),
            "Batch complete, checkpoint cleared"
        );

        Ok(stats)
    }

    /// Save `state` for the next run. A save failure is logged, not returned,
    /// so the caller still surfaces the error that stopped the run.
    fn persist(&self, state: &AggregationState) {
        if let Err(e) = self.store.save(state) {
            error!(
                error = %e,
                path = %self.store.path().display(),
                %state,
                "Failed to persist checkpoint; progress of this run is lost"
            );
        } else {
            warn!(path = %self.store.path().display(), "Run halted, re-run to resume");
        }
    }
}
