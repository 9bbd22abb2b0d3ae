//! History source contract and request/error types.
//!
//! A [`HistorySource`] turns a [`HistoryRequest`] (symbol + lookback period)
//! into a [`PriceHistory`]. Absence of data is an *empty* history, never an
//! error; [`SourceError`] is reserved for transport and upstream failures.
//!
//! | Implementation | Provider |
//! |----------------|----------|
//! | [`YahooHistorySource`](crate::adapters::YahooHistorySource) | Yahoo Finance chart API |
//! | [`CsvDirectorySource`](crate::adapters::CsvDirectorySource) | `{dir}/{SYMBOL}.csv` files |
//! | [`InMemoryHistorySource`] | Preloaded histories (tests, demos) |

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{LookbackPeriod, PriceHistory, ProviderId, Symbol};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Timeout,
    InvalidRequest,
    Internal,
}

/// Structured error returned by history sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for a single instrument history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub period: LookbackPeriod,
}

impl HistoryRequest {
    pub fn new(symbol: Symbol, period: LookbackPeriod) -> Self {
        Self { symbol, period }
    }
}

/// Boxed future returned by [`HistorySource::fetch_history`].
pub type HistoryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PriceHistory, SourceError>> + Send + 'a>>;

/// Daily price history provider.
///
/// Implementations must be `Send + Sync`; the pipeline shares one source
/// across its worker tasks.
pub trait HistorySource: Send + Sync {
    /// Provider identifier used in diagnostics.
    fn id(&self) -> ProviderId;

    /// Fetches the daily history of `req.symbol` over `req.period`.
    ///
    /// Returns an empty [`PriceHistory`] when the provider has no data for the
    /// symbol.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider cannot be reached or answers
    /// with something that is neither data nor a "no data" signal.
    fn fetch_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a>;
}

/// Source serving preloaded histories, with optional injected failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistorySource {
    histories: HashMap<Symbol, PriceHistory>,
    failures: HashMap<Symbol, SourceError>,
}

impl InMemoryHistorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.histories.insert(history.symbol.clone(), history);
        self
    }

    pub fn with_failure(mut self, symbol: Symbol, error: SourceError) -> Self {
        self.failures.insert(symbol, error);
        self
    }
}

impl HistorySource for InMemoryHistorySource {
    fn id(&self) -> ProviderId {
        ProviderId::Memory
    }

    fn fetch_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move {
            if let Some(error) = self.failures.get(&req.symbol) {
                return Err(error.clone());
            }

            Ok(self
                .histories
                .get(&req.symbol)
                .cloned()
                .map(|history| history.trim_to(req.period))
                .unwrap_or_else(|| PriceHistory::empty(req.symbol)))
        })
    }
}
