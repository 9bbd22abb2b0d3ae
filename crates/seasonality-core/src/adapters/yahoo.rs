use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{PriceHistory, PriceRecord, ProviderId, Symbol};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const NOT_FOUND_CODE: &str = "Not Found";

/// Daily history from the Yahoo Finance v8 chart endpoint.
///
/// Transport errors and throttling/server statuses are retried according to
/// the [`RetryPolicy`]. A symbol Yahoo does not know ("Not Found") yields an
/// empty history.
#[derive(Clone)]
pub struct YahooHistorySource {
    http_client: Arc<dyn HttpClient>,
    retry: RetryPolicy,
    base_url: String,
    timeout_ms: u64,
}

impl Default for YahooHistorySource {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooHistorySource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn chart_url(&self, req: &HistoryRequest) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url,
            urlencoding::encode(req.symbol.as_str()),
            req.period.as_str()
        )
    }

    async fn execute_with_retry(&self, url: &str) -> Result<HttpResponse, SourceError> {
        let mut attempt = 0;
        loop {
            let request = HttpRequest::get(url)
                .with_header("accept", "application/json")
                .with_header("referer", "https://finance.yahoo.com/")
                .with_timeout_ms(self.timeout_ms);
            let outcome = self.http_client.execute(request).await;

            let retry_reason = match &outcome {
                Ok(response) if self.retry.should_retry_status(response.status) => {
                    Some(format!("status {}", response.status))
                }
                Err(error) if error.retryable() => Some(error.message().to_owned()),
                _ => None,
            };

            match retry_reason {
                Some(reason) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    debug!(url, attempt, ?delay, %reason, "retrying yahoo chart request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => {
                    return outcome.map_err(|error| {
                        if error.timed_out() {
                            SourceError::timeout(format!("yahoo request timed out: {error}"))
                        } else if error.retryable() {
                            SourceError::unavailable(format!("yahoo transport error: {error}"))
                        } else {
                            SourceError::internal(format!("yahoo transport error: {error}"))
                        }
                    });
                }
            }
        }
    }
}

impl HistorySource for YahooHistorySource {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move {
            let url = self.chart_url(&req);
            let response = self.execute_with_retry(&url).await?;

            match response.status {
                429 => Err(SourceError::rate_limited("yahoo rate limited the chart request")),
                status if response.is_success() || status == 404 => {
                    parse_chart(&req.symbol, &response.body)
                }
                status => Err(SourceError::unavailable(format!(
                    "yahoo returned status {status}"
                ))),
            }
        })
    }
}

/// Converts a v8 chart payload into a price history.
///
/// Session dates are taken in exchange-local time (`meta.gmtoffset`). Rows
/// without a close are skipped, a missing open is kept as `None`, and a
/// repeated session date keeps the latest row.
pub fn parse_chart(symbol: &Symbol, body: &str) -> Result<PriceHistory, SourceError> {
    let payload: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = payload.chart.error {
        if error.code == NOT_FOUND_CODE {
            debug!(symbol = %symbol, description = %error.description, "yahoo has no data");
            return Ok(PriceHistory::empty(symbol.clone()));
        }
        return Err(SourceError::unavailable(format!(
            "yahoo chart API error {}: {}",
            error.code, error.description
        )));
    }

    let Some(result) = payload.chart.result.and_then(|results| results.into_iter().next())
    else {
        return Ok(PriceHistory::empty(symbol.clone()));
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(PriceHistory::empty(symbol.clone()));
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = result.meta.map(|meta| meta.gmtoffset).unwrap_or(0);

    let mut records: Vec<PriceRecord> = Vec::with_capacity(timestamps.len());
    for (index, ts) in timestamps.into_iter().enumerate() {
        let Some(close) = quote.close.get(index).copied().flatten() else {
            continue;
        };
        let open = quote.open.get(index).copied().flatten();
        let Some(date) = ts
            .checked_add(offset)
            .and_then(|local| OffsetDateTime::from_unix_timestamp(local).ok())
            .map(OffsetDateTime::date)
        else {
            warn!(
                symbol = %symbol,
                timestamp = ts,
                offset,
                "skipping yahoo row with unrepresentable timestamp"
            );
            continue;
        };

        let record = match PriceRecord::new(date, open, close) {
            Ok(record) => record,
            Err(error) => {
                warn!(symbol = %symbol, %date, %error, "skipping invalid yahoo row");
                continue;
            }
        };

        match records.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            Some(last) if last.date > record.date => {
                warn!(symbol = %symbol, %date, "skipping out-of-order yahoo row");
            }
            _ => records.push(record),
        }
    }

    PriceHistory::new(symbol.clone(), records)
        .map_err(|e| SourceError::internal(format!("yahoo history is inconsistent: {e}")))
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}
