//! Control-break aggregation.
//!
//! Records are folded in order. A change of key "breaks" the current group,
//! emitting its total. Grouping is by contiguous run only: a key that comes
//! back after a different key starts a new group.

use crate::checkpoint::AggregationState;
use crate::models::{CtlBreakError, Record, ResultEntry};
use tracing::{debug, error, info};

/// Result of driving the engine over a record sequence.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every record was folded; `results` holds one entry per contiguous run.
    Completed {
        results: Vec<ResultEntry>,
        state: AggregationState,
    },
    /// Iteration stopped early. `state` is exactly what was folded so far,
    /// including the partial sum of the interrupted group.
    Failed {
        state: AggregationState,
        error: CtlBreakError,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Final state in either outcome.
    pub fn state(&self) -> &AggregationState {
        match self {
            Self::Completed { state, .. } | Self::Failed { state, .. } => state,
        }
    }
}

/// Outcome of folding a single record: the next state plus a total if the
/// record broke the current group, or the untouched state and the cause.
pub type FoldResult = std::result::Result<
    (AggregationState, Option<ResultEntry>),
    (AggregationState, CtlBreakError),
>;

/// Fold the record at `position` into `state`.
///
/// On overflow the state is returned as it was before this record.
pub fn fold_record(mut state: AggregationState, position: usize, record: Record) -> FoldResult {
    let breaks = state
        .current_key
        .as_ref()
        .is_some_and(|key| *key != record.key);
    let base = if breaks { 0 } else { state.current_sum };

    let Some(sum) = base.checked_add(record.value) else {
        let error = CtlBreakError::Overflow {
            key: record.key,
            index: position,
        };
        return Err((state, error));
    };

    let previous_total = state.current_sum;
    let emitted = if breaks {
        state
            .current_key
            .take()
            .map(|key| ResultEntry::new(key, previous_total))
    } else {
        None
    };

    state.current_key = Some(record.key);
    state.current_sum = sum;
    state.index = position + 1;
    Ok((state, emitted))
}

/// Total for the trailing group, if any record was ever folded.
pub fn flush(state: &AggregationState) -> Option<ResultEntry> {
    state
        .current_key
        .as_ref()
        .map(|key| ResultEntry::new(key.clone(), state.current_sum))
}

/// Drive the control break from `initial` to the end of `records`.
///
/// `records` yields the whole input from position 0; items before
/// `initial.index` were already folded by an earlier run and are skipped.
/// A read error stops iteration with the state as of the last good record.
pub fn run<I, E>(records: I, initial: AggregationState) -> RunOutcome
where
    I: IntoIterator<Item = std::result::Result<Record, E>>,
    E: Into<CtlBreakError>,
{
    let start = initial.index;
    let mut state = initial;
    let mut results = Vec::new();
    let mut seen = 0usize;

    debug!(resume_index = start, key = ?state.current_key, "Engine starting");

    for (position, item) in records.into_iter().enumerate() {
        seen = position + 1;
        if position < start {
            continue;
        }

        let record = match item {
            Ok(record) => record,
            Err(e) => return fail(state, position, e.into()),
        };

        match fold_record(state, position, record) {
            Ok((next, emitted)) => {
                state = next;
                if let Some(entry) = emitted {
                    info!(key = %entry.key, sum = entry.total, "Group complete");
                    results.push(entry);
                }
            }
            Err((unchanged, e)) => return fail(unchanged, position, e),
        }
    }

    if seen < start {
        let error = CtlBreakError::input(
            None,
            format!("input has {seen} records but resume index is {start}"),
        );
        return fail(state, seen, error);
    }

    if let Some(entry) = flush(&state) {
        info!(key = %entry.key, sum = entry.total, "Group complete");
        results.push(entry);
    }

    RunOutcome::Completed { results, state }
}

fn fail(state: AggregationState, position: usize, cause: CtlBreakError) -> RunOutcome {
    error!(position, %state, error = %cause, "Aggregation stopped");
    RunOutcome::Failed {
        state,
        error: CtlBreakError::aggregation(position, cause),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(&str, i64)]) -> Vec<Record> {
        pairs.iter().map(|(k, v)| Record::new(*k, *v)).collect()
    }

    fn entries(pairs: &[(&str, i64)]) -> Vec<ResultEntry> {
        pairs.iter().map(|(k, v)| ResultEntry::new(*k, *v)).collect()
    }

    fn ok_stream(records: Vec<Record>) -> impl Iterator<Item = Result<Record, CtlBreakError>> {
        records.into_iter().map(Ok)
    }

    fn sample() -> Vec<Record> {
        records(&[
            ("A", 10),
            ("A", 20),
            ("A", 30),
            ("B", 15),
            ("B", 25),
            ("C", 35),
            ("C", 45),
            ("C", 55),
        ])
    }

    fn completed(outcome: RunOutcome) -> (Vec<ResultEntry>, AggregationState) {
        match outcome {
            RunOutcome::Completed { results, state } => (results, state),
            RunOutcome::Failed { error, .. } => panic!("unexpected failure: {error}"),
        }
    }

    #[test]
    fn test_full_run() {
        let (results, state) = completed(run(ok_stream(sample()), AggregationState::new()));

        assert_eq!(results, entries(&[("A", 60), ("B", 40), ("C", 135)]));
        assert_eq!(state.index, 8);
        assert_eq!(state.current_key.as_deref(), Some("C"));
        assert_eq!(state.current_sum, 135);
    }

    #[test]
    fn test_resume_with_partial_sum() {
        let initial = AggregationState {
            current_key: Some("B".to_string()),
            current_sum: 15,
            index: 4,
        };
        let (results, _) = completed(run(ok_stream(sample()), initial));
        assert_eq!(results, entries(&[("B", 40), ("C", 135)]));
    }

    #[test]
    fn test_empty_input() {
        let (results, state) = completed(run(ok_stream(Vec::new()), AggregationState::new()));
        assert!(results.is_empty());
        assert_eq!(state, AggregationState::new());
    }

    #[test]
    fn test_non_contiguous_keys_not_merged() {
        let input = records(&[("A", 1), ("B", 2), ("A", 3)]);
        let (results, _) = completed(run(ok_stream(input), AggregationState::new()));
        assert_eq!(results, entries(&[("A", 1), ("B", 2), ("A", 3)]));
    }

    #[test]
    fn test_negative_values() {
        let input = records(&[("A", -5), ("A", 3), ("B", -1)]);
        let (results, _) = completed(run(ok_stream(input), AggregationState::new()));
        assert_eq!(results, entries(&[("A", -2), ("B", -1)]));
    }

    #[test]
    fn test_entry_count_matches_runs() {
        let input = records(&[
            ("x", 1),
            ("y", 1),
            ("y", 1),
            ("x", 1),
            ("x", 1),
            ("x", 1),
            ("z", 4),
        ]);
        let (results, _) = completed(run(ok_stream(input), AggregationState::new()));
        assert_eq!(results, entries(&[("x", 1), ("y", 2), ("x", 3), ("z", 4)]));
    }

    /// Fold `input[..split]` record by record, collecting flushed groups.
    fn fold_prefix(input: &[Record], split: usize) -> (Vec<ResultEntry>, AggregationState) {
        let mut state = AggregationState::new();
        let mut flushed = Vec::new();
        for (i, record) in input[..split].iter().cloned().enumerate() {
            let (next, emitted) = fold_record(state, i, record).unwrap();
            state = next;
            flushed.extend(emitted);
        }
        (flushed, state)
    }

    #[test]
    fn test_resume_equivalence_at_every_boundary() {
        let input = records(&[("A", 1), ("A", 2), ("B", 3), ("C", 4), ("C", 5), ("A", 6)]);
        let (full, _) = completed(run(ok_stream(input.clone()), AggregationState::new()));

        for split in 0..input.len() {
            // First run dies reading record `split`.
            let failing = input[..split]
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(CtlBreakError::input(None, "boom"))));

            let checkpoint = match run(failing, AggregationState::new()) {
                RunOutcome::Failed { state, .. } => state,
                RunOutcome::Completed { .. } => panic!("expected failure at {split}"),
            };

            let (mut combined, expected_state) = fold_prefix(&input, split);
            assert_eq!(checkpoint, expected_state, "split at {split}");

            let (rest, _) = completed(run(ok_stream(input.clone()), checkpoint));
            combined.extend(rest);
            assert_eq!(combined, full, "split at {split}");
        }
    }

    #[test]
    fn test_read_error_preserves_partial_state() {
        let stream = vec![
            Ok(Record::new("A", 10)),
            Ok(Record::new("A", 20)),
            Err(CtlBreakError::input(Some(3), "invalid digit")),
            Ok(Record::new("B", 1)),
        ];

        match run(stream, AggregationState::new()) {
            RunOutcome::Failed { state, error } => {
                assert_eq!(
                    state,
                    AggregationState {
                        current_key: Some("A".to_string()),
                        current_sum: 30,
                        index: 2,
                    }
                );
                assert!(matches!(error, CtlBreakError::Aggregation { index: 2, .. }));
            }
            RunOutcome::Completed { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_overflow_leaves_state_before_record() {
        let input = records(&[("A", i64::MAX), ("A", 1)]);

        let outcome = run(ok_stream(input), AggregationState::new());
        assert!(!outcome.is_completed());
        assert_eq!(
            outcome.state(),
            &AggregationState {
                current_key: Some("A".to_string()),
                current_sum: i64::MAX,
                index: 1,
            }
        );

        match outcome {
            RunOutcome::Failed { error, .. } => {
                let CtlBreakError::Aggregation { source, .. } = error else {
                    panic!("expected aggregation error");
                };
                assert!(matches!(*source, CtlBreakError::Overflow { index: 1, .. }));
            }
            RunOutcome::Completed { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_key_change_resets_sum_without_overflow() {
        let input = records(&[("A", i64::MAX), ("B", i64::MAX)]);
        let (results, _) = completed(run(ok_stream(input), AggregationState::new()));
        assert_eq!(results, entries(&[("A", i64::MAX), ("B", i64::MAX)]));
    }

    #[test]
    fn test_resume_index_beyond_input_fails() {
        let initial = AggregationState {
            current_key: Some("C".to_string()),
            current_sum: 5,
            index: 10,
        };

        let outcome = run(ok_stream(sample()), initial.clone());
        assert!(!outcome.is_completed());
        assert_eq!(outcome.state(), &initial);
    }

    #[test]
    fn test_resume_at_end_flushes_trailing_group() {
        let initial = AggregationState {
            current_key: Some("C".to_string()),
            current_sum: 135,
            index: 8,
        };
        let (results, _) = completed(run(ok_stream(sample()), initial));
        assert_eq!(results, entries(&[("C", 135)]));
    }

    #[test]
    fn test_deterministic() {
        let a = completed(run(ok_stream(sample()), AggregationState::new()));
        let b = completed(run(ok_stream(sample()), AggregationState::new()));
        assert_eq!(a, b);
    }
}
