// Shared fixtures for the seasonality behavior tests
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

pub use std::sync::Arc;

pub use seasonality_core::{
    AggregationError, AggregationPipeline, HistoryFuture, HistoryRequest, HistorySource,
    HttpClient, HttpError, HttpRequest, HttpResponse, InMemoryHistorySource, LookbackPeriod,
    PipelineConfig, PriceHistory, PriceRecord, ProviderId, RetryPolicy, SourceError, Symbol,
};
use time::Date;

/// Three sessions of AAPL in early January 2024, the last without an open.
pub const CHART_BODY: &str = r#"{"chart":{"result":[{
    "meta":{"symbol":"AAPL","currency":"USD","gmtoffset":-18000},
    "timestamp":[1704205800,1704292200,1704378600],
    "indicators":{"quote":[{
        "open":[187.15,184.22,null],
        "high":[188.44,185.88,182.76],
        "close":[185.64,184.25,181.91],
        "volume":[82488700,58414500,71983600]}]}}],"error":null}}"#;

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

/// History of `(date, open, close)` sessions.
pub fn history(raw: &str, sessions: &[(Date, f64, f64)]) -> PriceHistory {
    let records = sessions
        .iter()
        .map(|(date, open, close)| PriceRecord::new(*date, Some(*open), *close).expect("record"))
        .collect();
    PriceHistory::new(symbol(raw), records).expect("ordered history")
}

/// Retries without jitter and with millisecond delays.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        factor: 2.0,
        jitter: false,
    }
}

/// One scripted transport reply.
pub enum Reply {
    Respond(Result<HttpResponse, HttpError>),
    /// Holds the request for its full timeout, then reports a timeout.
    Stall,
}

/// Replays scripted replies in order and records every request.
#[derive(Default)]
pub struct ScriptedHttpClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Self::with_replies(responses.into_iter().map(Reply::Respond).collect())
    }

    pub fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let timeout = Duration::from_millis(request.timeout_ms);
            self.requests.lock().expect("requests lock").push(request);
            let reply = self.replies.lock().expect("replies lock").pop_front();
            match reply {
                Some(Reply::Respond(outcome)) => outcome,
                Some(Reply::Stall) => {
                    tokio::time::sleep(timeout).await;
                    Err(HttpError::timeout("operation timed out"))
                }
                None => Err(HttpError::non_retryable("script exhausted")),
            }
        })
    }
}
