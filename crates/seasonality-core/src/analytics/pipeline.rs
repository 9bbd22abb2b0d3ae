use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::aggregate::{CrossSectionalAggregator, DivisorPolicy};
use super::bucket::{bucket_all, BucketScheme, InstrumentBuckets};
use super::percent_change::extract;
use super::result::{AggregateResult, AggregationReport, FailedInstrument, SchemeAverage};
use crate::data_source::{HistoryRequest, HistorySource, SourceError};
use crate::throttling::FetchThrottle;
use crate::{AggregationError, LookbackPeriod, Symbol, UtcDateTime};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime knobs of an [`AggregationPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    concurrency: NonZeroUsize,
    timeout: Duration,
    divisor: DivisorPolicy,
    throttle: Option<FetchThrottle>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            timeout: DEFAULT_TIMEOUT,
            divisor: DivisorPolicy::default(),
            throttle: None,
        }
    }
}

impl PipelineConfig {
    /// Maximum number of lookups in flight; zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = NonZeroUsize::new(concurrency).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Per-instrument lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_divisor(mut self, divisor: DivisorPolicy) -> Self {
        self.divisor = divisor;
        self
    }

    /// Caps lookups per minute across all workers; zero disables the cap.
    pub fn with_rate_limit_per_minute(mut self, per_minute: u32) -> Self {
        self.throttle = FetchThrottle::from_limit(per_minute);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    pub fn rate_limit_per_minute(&self) -> Option<u32> {
        self.throttle.as_ref().map(FetchThrottle::limit)
    }
}

/// Cooperative cancellation flag shared between a run and its caller.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

enum InstrumentOutcome {
    Bucketed {
        symbol: Symbol,
        buckets: InstrumentBuckets,
        sanitized: usize,
    },
    Empty {
        symbol: Symbol,
    },
    Failed {
        symbol: Symbol,
        error: SourceError,
    },
    Cancelled,
}

/// Fetches a universe, buckets every non-empty history and averages each
/// scheme across instruments.
///
/// Lookups run on a bounded set of tokio tasks; their results are folded in
/// the calling task as they complete.
pub struct AggregationPipeline {
    source: Arc<dyn HistorySource>,
    config: PipelineConfig,
    cancellation: CancellationHandle,
}

impl AggregationPipeline {
    pub fn new(source: Arc<dyn HistorySource>) -> Self {
        Self {
            source,
            config: PipelineConfig::default(),
            cancellation: CancellationHandle::new(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Runs the pipeline over `universe`.
    ///
    /// Empty histories, failed or panicked lookups and timed-out lookups are
    /// skipped and recorded in the [`AggregationReport`].
    ///
    /// # Errors
    ///
    /// [`AggregationError::EmptyUniverse`] when no instrument has a non-empty
    /// history, [`AggregationError::Cancelled`] when the run is cancelled.
    pub async fn run(
        &self,
        universe: &[Symbol],
        period: LookbackPeriod,
    ) -> Result<AggregateResult, AggregationError> {
        if self.cancellation.is_cancelled() {
            return Err(AggregationError::Cancelled);
        }

        let mut report = AggregationReport::default();
        let mut seen = HashSet::with_capacity(universe.len());
        let mut symbols = Vec::with_capacity(universe.len());
        for symbol in universe {
            if seen.insert(symbol.clone()) {
                symbols.push(symbol.clone());
            } else {
                warn!(symbol = %symbol, "duplicate symbol in universe; fetching once");
                report.duplicates.push(symbol.clone());
            }
        }

        info!(
            instruments = symbols.len(),
            %period,
            source = %self.source.id(),
            concurrency = self.config.concurrency(),
            rate_limit_per_minute = ?self.config.rate_limit_per_minute(),
            divisor = %self.config.divisor,
            "starting seasonality aggregation"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(symbols.len());
        for symbol in symbols.iter().cloned() {
            let task = tasks.spawn(lookup_instrument(
                Arc::clone(&self.source),
                Arc::clone(&semaphore),
                self.config.throttle.clone(),
                self.cancellation.clone(),
                self.config.timeout,
                HistoryRequest::new(symbol.clone(), period),
            ));
            pending.insert(task.id(), symbol);
        }

        let mut aggregators = BucketScheme::ALL.map(CrossSectionalAggregator::new);
        let mut considered = 0usize;

        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    tasks.abort_all();
                    warn!("aggregation cancelled; discarding partial results");
                    return Err(AggregationError::Cancelled);
                }
                joined = tasks.join_next_with_id() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let outcome = match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    outcome
                }
                Err(join_error) => {
                    let Some(symbol) = pending.remove(&join_error.id()) else {
                        warn!(error = %join_error, "unknown instrument task did not complete");
                        continue;
                    };
                    InstrumentOutcome::Failed {
                        symbol,
                        error: SourceError::internal(format!(
                            "lookup task did not complete: {join_error}"
                        )),
                    }
                }
            };

            match outcome {
                InstrumentOutcome::Bucketed {
                    symbol,
                    buckets,
                    sanitized,
                } => {
                    for aggregator in &mut aggregators {
                        let scheme = aggregator.scheme();
                        aggregator.include(&symbol, buckets.get(scheme))?;
                    }
                    considered += 1;
                    report.dropped_records += buckets.dropped_records;
                    report.sanitized_records += sanitized;
                }
                InstrumentOutcome::Empty { symbol } => {
                    warn!(symbol = %symbol, "empty price history; instrument skipped");
                    report.empty_histories.push(symbol);
                }
                InstrumentOutcome::Failed { symbol, error } => {
                    warn!(
                        symbol = %symbol,
                        code = error.code(),
                        error = %error,
                        "history lookup failed; instrument skipped"
                    );
                    report.failed.push(FailedInstrument {
                        symbol,
                        code: error.code().to_owned(),
                        message: error.message().to_owned(),
                    });
                }
                InstrumentOutcome::Cancelled => {
                    return Err(AggregationError::Cancelled);
                }
            }
        }

        if self.cancellation.is_cancelled() {
            return Err(AggregationError::Cancelled);
        }
        if considered == 0 {
            warn!(
                requested = symbols.len(),
                skipped = report.skipped(),
                "no instrument produced price data"
            );
            return Err(AggregationError::EmptyUniverse);
        }

        let [day, week, month] = aggregators;
        let day = self.finish_scheme(day, &mut report)?;
        let week = self.finish_scheme(week, &mut report)?;
        let month = self.finish_scheme(month, &mut report)?;
        report.normalize();

        info!(
            requested = symbols.len(),
            considered,
            skipped = report.skipped(),
            excluded = report.exclusions.len(),
            "seasonality aggregation finished"
        );

        Ok(AggregateResult {
            period,
            divisor: self.config.divisor,
            requested: symbols.len(),
            considered,
            day,
            week,
            month,
            report,
            generated_at: UtcDateTime::now(),
        })
    }

    fn finish_scheme(
        &self,
        aggregator: CrossSectionalAggregator,
        report: &mut AggregationReport,
    ) -> Result<SchemeAverage, AggregationError> {
        let scheme = aggregator.scheme();
        let considered = aggregator.considered();
        let included = aggregator.included();
        report.exclusions.extend_from_slice(aggregator.exclusions());

        match aggregator.finish(self.config.divisor) {
            Ok(vector) => Ok(SchemeAverage::available(vector, considered, included)),
            Err(AggregationError::EmptyScheme { .. }) => {
                warn!(
                    scheme = %scheme,
                    considered,
                    "every vector was excluded; scheme average unavailable"
                );
                Ok(SchemeAverage::unavailable(scheme, considered, included))
            }
            Err(error) => Err(error),
        }
    }
}

async fn lookup_instrument(
    source: Arc<dyn HistorySource>,
    semaphore: Arc<Semaphore>,
    throttle: Option<FetchThrottle>,
    cancellation: CancellationHandle,
    timeout: Duration,
    req: HistoryRequest,
) -> InstrumentOutcome {
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return InstrumentOutcome::Cancelled;
    };
    if cancellation.is_cancelled() {
        return InstrumentOutcome::Cancelled;
    }

    let symbol = req.symbol.clone();
    let fetch = async {
        if let Some(throttle) = &throttle {
            if !throttle.try_acquire() {
                debug!(
                    symbol = %symbol,
                    spacing = ?throttle.spacing(),
                    "request budget spent; waiting for the rate limit"
                );
                throttle.acquire().await;
            }
        }
        tokio::time::timeout(timeout, source.fetch_history(req)).await
    };

    let fetched = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return InstrumentOutcome::Cancelled,
        fetched = fetch => fetched,
    };

    let history = match fetched {
        Ok(Ok(history)) => history,
        Ok(Err(error)) => return InstrumentOutcome::Failed { symbol, error },
        Err(_) => {
            return InstrumentOutcome::Failed {
                symbol,
                error: SourceError::timeout(format!(
                    "lookup exceeded {} ms",
                    timeout.as_millis()
                )),
            }
        }
    };

    if history.is_empty() {
        return InstrumentOutcome::Empty { symbol };
    }

    let series = extract(&history);
    if series.sanitized > 0 {
        debug!(
            symbol = %symbol,
            sanitized = series.sanitized,
            "replaced undefined changes with zero"
        );
    }
    let buckets = bucket_all(&series);
    debug!(symbol = %symbol, records = series.len(), "instrument bucketed");

    InstrumentOutcome::Bucketed {
        symbol,
        buckets,
        sanitized: series.sanitized,
    }
}
