//! # Seasonality Core
//!
//! Calendar-bucketed, cross-sectional price change analysis.
//!
//! ## Overview
//!
//! For every instrument of a universe the engine fetches a daily price
//! history, turns each session into a percentage change
//! (`(close - open) / open * 100`), sums the changes into three calendar
//! schemes and averages each scheme slot-wise across instruments:
//!
//! | Scheme | Slots | Labels |
//! |--------|-------|--------|
//! | day-of-week | 6 | Monday..Saturday |
//! | week-of-year | 53 | ISO week 1..53 (shown 0..52) |
//! | month-of-year | 12 | January..December |
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | History sources (Yahoo chart API, CSV directory) |
//! | [`analytics`] | Extraction, bucketing, averaging and the pipeline |
//! | [`data_source`] | History source trait and request/error types |
//! | [`domain`] | Domain models (Symbol, PriceHistory, LookbackPeriod) |
//! | [`error`] | Core error types |
//! | [`export`] | Three-row CSV persisted record |
//! | [`http_client`] | HTTP client abstraction |
//! | [`retry`] | Backoff policy for upstream calls |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Shared request-rate limit |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use seasonality_core::{AggregationPipeline, LookbackPeriod, Symbol, YahooHistorySource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let universe = vec![Symbol::parse("AAPL")?, Symbol::parse("MSFT")?];
//!     let pipeline = AggregationPipeline::new(Arc::new(YahooHistorySource::default()));
//!
//!     let result = pipeline.run(&universe, LookbackPeriod::TenYears).await?;
//!     println!("{:?}", result.day.values);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Source failures never abort a run; they are recorded in the
//! [`AggregationReport`] and the instrument is skipped:
//!
//! ```rust
//! use seasonality_core::AggregationError;
//!
//! fn describe(error: &AggregationError) -> &'static str {
//!     match error {
//!         AggregationError::EmptyUniverse => "no instrument had data",
//!         AggregationError::EmptyScheme { .. } => "every vector was excluded",
//!         AggregationError::Cancelled => "interrupted",
//!         AggregationError::SchemeMismatch { .. } => "internal error",
//!     }
//! }
//! ```

pub mod adapters;
pub mod analytics;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod export;
pub mod http_client;
pub mod retry;
pub mod source;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{CsvDirectorySource, YahooHistorySource};

// Analytics
pub use analytics::{
    AggregateResult, AggregationPipeline, AggregationReport, BucketScheme, BucketVector,
    CancellationHandle, CrossSectionalAggregator, DivisorPolicy, Exclusion, FailedInstrument,
    Inclusion, InstrumentBuckets, PercentChangeSeries, PipelineConfig, SchemeAverage,
};

// Data source trait and types
pub use data_source::{
    HistoryFuture, HistoryRequest, HistorySource, InMemoryHistorySource, SourceError,
    SourceErrorKind,
};

// Domain models
pub use domain::{parse_session_date, LookbackPeriod, PriceHistory, PriceRecord, Symbol, UtcDateTime};

// Error types
pub use error::{AggregationError, ExportError, ValidationError};

// Export
pub use export::{export_csv, PersistedRecord};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Retry logic
pub use retry::RetryPolicy;

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::FetchThrottle;
