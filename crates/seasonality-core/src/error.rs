use thiserror::Error;

use crate::analytics::BucketScheme;

/// Validation and contract errors exposed by `seasonality-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error(
        "invalid lookback period '{value}', expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max"
    )]
    InvalidPeriod { value: String },
    #[error("invalid divisor policy '{value}', expected 'total' or 'included'")]
    InvalidDivisorPolicy { value: String },
    #[error("invalid source '{value}', expected one of yahoo, csv-dir, memory")]
    InvalidSource { value: String },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("history dates must be strictly ascending: {current} does not follow {previous}")]
    UnorderedHistory { previous: String, current: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
}

/// Failures of a cross-sectional aggregation run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("no instrument produced price data; nothing to average")]
    EmptyUniverse,

    #[error("every {scheme} vector was excluded; the {scheme} average is undefined")]
    EmptyScheme { scheme: BucketScheme },

    #[error("cannot combine a {found} vector into a {expected} accumulator")]
    SchemeMismatch {
        expected: BucketScheme,
        found: BucketScheme,
    },

    #[error("aggregation run was cancelled")]
    Cancelled,
}

/// Failures while writing the persisted result record.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
