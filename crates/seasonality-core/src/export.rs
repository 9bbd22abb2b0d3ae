//! Persisted form of an aggregation result.
//!
//! The record is a three-row CSV: the lookback period label, the day-of-week
//! averages and the month-of-year averages. The week-of-year vector is not
//! persisted. A scheme without an average is written as empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::analytics::{AggregateResult, BucketScheme};
use crate::{ExportError, LookbackPeriod};

/// Flat record written by [`export_csv`].
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub period: LookbackPeriod,
    pub day: Option<Vec<f64>>,
    pub month: Option<Vec<f64>>,
}

impl PersistedRecord {
    pub fn from_result(result: &AggregateResult) -> Self {
        Self {
            period: result.period,
            day: result.day.values.clone(),
            month: result.month.values.clone(),
        }
    }

    /// Writes the three rows to `writer`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut csv = WriterBuilder::new().flexible(true).from_writer(writer);

        csv.write_record([self.period.as_str()])?;
        csv.write_record(slot_cells(BucketScheme::Day, self.day.as_deref()))?;
        csv.write_record(slot_cells(BucketScheme::Month, self.month.as_deref()))?;
        csv.flush()?;
        Ok(())
    }
}

fn slot_cells(scheme: BucketScheme, values: Option<&[f64]>) -> Vec<String> {
    match values {
        Some(values) => values.iter().map(f64::to_string).collect(),
        None => vec![String::new(); scheme.slot_count()],
    }
}

/// Writes the persisted record of `result` to `path`, replacing any existing file.
pub fn export_csv(result: &AggregateResult, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    PersistedRecord::from_result(result).write_csv(file)?;
    info!(path = %path.display(), period = %result.period, "exported seasonality record");
    Ok(())
}
