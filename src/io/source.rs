//! Record sources.

use crate::models::{CtlBreakError, Record, Result};
use csv::{ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use tracing::info;

/// An ordered, positionally stable sequence of records.
///
/// Resuming is only sound if repeated loads of the same input return the
/// same records in the same order.
pub trait RecordSource {
    fn load(&self) -> Result<Vec<Record>>;
}

impl RecordSource for Vec<Record> {
    fn load(&self) -> Result<Vec<Record>> {
        Ok(self.clone())
    }
}

/// Headerless `key,value` CSV file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvSource {
    fn load(&self) -> Result<Vec<Record>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| {
                CtlBreakError::input(None, format!("opening {}: {e}", self.path.display()))
            })?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| {
                let line = e.position().map(|p| p.line());
                CtlBreakError::input(line, e.to_string())
            })?;
            records.push(parse_row(&row)?);
        }

        info!(count = records.len(), path = %self.path.display(), "Loaded records");
        Ok(records)
    }
}

fn parse_row(row: &StringRecord) -> Result<Record> {
    let line = row.position().map(|p| p.line());

    if row.len() != 2 {
        return Err(CtlBreakError::input(
            line,
            format!("expected 2 fields (key,value), found {}", row.len()),
        ));
    }

    let value = row[1]
        .trim()
        .parse::<i64>()
        .map_err(|e| CtlBreakError::input(line, format!("invalid value {:?}: {e}", &row[1])))?;

    Ok(Record::new(&row[0], value))
}
