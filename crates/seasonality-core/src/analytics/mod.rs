//! # Seasonality Analytics
//!
//! The aggregation engine, leaf to root:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Percentage change | [`percent_change`] | [`PercentChangeSeries`] |
//! | Calendar bucketing | [`bucket`] | [`InstrumentBuckets`] (day, week, month) |
//! | Cross-sectional average | [`aggregate`] | averaged [`BucketVector`] per scheme |
//! | Orchestration | [`pipeline`] | [`AggregateResult`] |
//!
//! Per-record and per-instrument problems are absorbed and logged; only a
//! universe with no usable history (or a cancelled run) is an error.

pub mod aggregate;
pub mod bucket;
pub mod percent_change;
pub mod pipeline;
pub mod result;

pub use aggregate::{average, CrossSectionalAggregator, DivisorPolicy, Exclusion, Inclusion};
pub use bucket::{bucket, bucket_all, BucketScheme, BucketVector, InstrumentBuckets};
pub use percent_change::{extract, percent_change, PercentChange, PercentChangeSeries};
pub use pipeline::{AggregationPipeline, CancellationHandle, PipelineConfig};
pub use result::{AggregateResult, AggregationReport, FailedInstrument, SchemeAverage};
