use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::warn;

use super::percent_change::PercentChangeSeries;
use crate::AggregationError;

const DAY_LABELS: [&str; 6] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Calendar bucketing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketScheme {
    /// Monday..Saturday, 6 slots.
    Day,
    /// ISO week 1..53, 53 slots.
    Week,
    /// January..December, 12 slots.
    Month,
}

impl BucketScheme {
    pub const ALL: [Self; 3] = [Self::Day, Self::Week, Self::Month];

    pub const fn slot_count(self) -> usize {
        match self {
            Self::Day => DAY_LABELS.len(),
            Self::Week => 53,
            Self::Month => MONTH_LABELS.len(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day-of-week",
            Self::Week => "week-of-year",
            Self::Month => "month-of-year",
        }
    }

    /// Zero-based bucket identity of `date`, before any range check.
    ///
    /// Day: 0 = Monday .. 6 = Sunday. Week: ISO week - 1. Month: month - 1.
    pub fn identity(self, date: Date) -> usize {
        match self {
            Self::Day => usize::from(date.weekday().number_days_from_monday()),
            Self::Week => usize::from(date.iso_week()) - 1,
            Self::Month => usize::from(u8::from(date.month())) - 1,
        }
    }

    /// Slot of `date` in this scheme, `None` when the identity has no slot
    /// (a Sunday session in the day scheme).
    pub fn slot_index(self, date: Date) -> Option<usize> {
        let identity = self.identity(date);
        (identity < self.slot_count()).then_some(identity)
    }

    /// Presentation labels, one per slot.
    pub fn labels(self) -> Vec<String> {
        match self {
            Self::Day => DAY_LABELS.iter().map(|label| (*label).to_owned()).collect(),
            Self::Week => (0..self.slot_count()).map(|week| week.to_string()).collect(),
            Self::Month => MONTH_LABELS.iter().map(|label| (*label).to_owned()).collect(),
        }
    }
}

impl Display for BucketScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-length slot accumulator for one scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketVector {
    scheme: BucketScheme,
    slots: Vec<f64>,
}

impl BucketVector {
    pub fn zeros(scheme: BucketScheme) -> Self {
        Self {
            scheme,
            slots: vec![0.0; scheme.slot_count()],
        }
    }

    /// Builds a vector from explicit slot values; `None` if the length does
    /// not match the scheme.
    pub fn from_slots(scheme: BucketScheme, slots: Vec<f64>) -> Option<Self> {
        (slots.len() == scheme.slot_count()).then_some(Self { scheme, slots })
    }

    pub const fn scheme(&self) -> BucketScheme {
        self.scheme
    }

    pub fn slots(&self) -> &[f64] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<f64> {
        self.slots
    }

    /// True when no slot is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.slots.iter().all(|value| value.is_finite())
    }

    /// Slot-wise sum with a vector of the same scheme.
    pub fn try_add(&mut self, other: &BucketVector) -> Result<(), AggregationError> {
        if self.scheme != other.scheme {
            return Err(AggregationError::SchemeMismatch {
                expected: self.scheme,
                found: other.scheme,
            });
        }
        for (slot, value) in self.slots.iter_mut().zip(&other.slots) {
            *slot += value;
        }
        Ok(())
    }

    pub(crate) fn divide(mut self, divisor: f64) -> Self {
        for slot in &mut self.slots {
            *slot /= divisor;
        }
        self
    }

    fn fold(&mut self, date: Date, value: f64) -> bool {
        match self.scheme.slot_index(date) {
            Some(index) => {
                self.slots[index] += value;
                true
            }
            None => false,
        }
    }
}

/// The three per-instrument bucket vectors of one history.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentBuckets {
    pub day: BucketVector,
    pub week: BucketVector,
    pub month: BucketVector,
    /// Records rejected by at least one scheme for lacking a slot.
    pub dropped_records: usize,
}

impl InstrumentBuckets {
    pub fn get(&self, scheme: BucketScheme) -> &BucketVector {
        match scheme {
            BucketScheme::Day => &self.day,
            BucketScheme::Week => &self.week,
            BucketScheme::Month => &self.month,
        }
    }
}

/// Sums a change series into the slots of one scheme.
pub fn bucket(series: &PercentChangeSeries, scheme: BucketScheme) -> BucketVector {
    let mut vector = BucketVector::zeros(scheme);
    for change in series.iter() {
        if !vector.fold(change.date, change.value) {
            warn!(
                scheme = %scheme,
                date = %change.date,
                identity = scheme.identity(change.date),
                "dropping record without a bucket slot"
            );
        }
    }
    vector
}

/// One pass over the series producing all three scheme vectors.
pub fn bucket_all(series: &PercentChangeSeries) -> InstrumentBuckets {
    let mut buckets = InstrumentBuckets {
        day: BucketVector::zeros(BucketScheme::Day),
        week: BucketVector::zeros(BucketScheme::Week),
        month: BucketVector::zeros(BucketScheme::Month),
        dropped_records: 0,
    };

    for change in series.iter() {
        let folded = [
            buckets.day.fold(change.date, change.value),
            buckets.week.fold(change.date, change.value),
            buckets.month.fold(change.date, change.value),
        ];
        if folded.contains(&false) {
            buckets.dropped_records += 1;
            warn!(
                date = %change.date,
                weekday = %change.date.weekday(),
                "dropping record from schemes without a matching slot"
            );
        }
    }

    buckets
}
