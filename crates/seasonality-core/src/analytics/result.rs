use serde::Serialize;

use super::aggregate::{DivisorPolicy, Exclusion};
use super::bucket::{BucketScheme, BucketVector};
use crate::{LookbackPeriod, Symbol, UtcDateTime};

/// Cross-sectional average of one scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeAverage {
    pub scheme: BucketScheme,
    pub labels: Vec<String>,
    /// Slot-wise mean; `None` when the divisor for this scheme was zero.
    pub values: Option<Vec<f64>>,
    pub considered: usize,
    pub included: usize,
}

impl SchemeAverage {
    pub(crate) fn available(vector: BucketVector, considered: usize, included: usize) -> Self {
        let scheme = vector.scheme();
        Self {
            scheme,
            labels: scheme.labels(),
            values: Some(vector.into_slots()),
            considered,
            included,
        }
    }

    pub(crate) fn unavailable(scheme: BucketScheme, considered: usize, included: usize) -> Self {
        Self {
            scheme,
            labels: scheme.labels(),
            values: None,
            considered,
            included,
        }
    }

    pub fn is_available(&self) -> bool {
        self.values.is_some()
    }
}

/// Instrument whose lookup failed or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedInstrument {
    pub symbol: Symbol,
    pub code: String,
    pub message: String,
}

/// Diagnostics collected while running the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationReport {
    pub duplicates: Vec<Symbol>,
    pub empty_histories: Vec<Symbol>,
    pub failed: Vec<FailedInstrument>,
    pub exclusions: Vec<Exclusion>,
    /// Records without a slot in at least one scheme (Sunday sessions).
    pub dropped_records: usize,
    /// Records whose change was undefined and counted as zero.
    pub sanitized_records: usize,
}

impl AggregationReport {
    /// Orders every list by symbol so reports do not depend on task completion order.
    pub(crate) fn normalize(&mut self) {
        self.empty_histories.sort();
        self.failed.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        self.exclusions
            .sort_by(|a, b| (a.scheme as u8, &a.symbol).cmp(&(b.scheme as u8, &b.symbol)));
    }

    pub fn skipped(&self) -> usize {
        self.empty_histories.len() + self.failed.len()
    }
}

/// Terminal artifact of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub period: LookbackPeriod,
    pub divisor: DivisorPolicy,
    /// Distinct symbols requested.
    pub requested: usize,
    /// Instruments with a non-empty history.
    pub considered: usize,
    pub day: SchemeAverage,
    pub week: SchemeAverage,
    pub month: SchemeAverage,
    pub report: AggregationReport,
    pub generated_at: UtcDateTime,
}

impl AggregateResult {
    pub fn scheme(&self, scheme: BucketScheme) -> &SchemeAverage {
        match scheme {
            BucketScheme::Day => &self.day,
            BucketScheme::Week => &self.week,
            BucketScheme::Month => &self.month,
        }
    }
}
