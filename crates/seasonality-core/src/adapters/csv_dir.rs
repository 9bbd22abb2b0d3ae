use std::io::ErrorKind;
use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError};
use crate::{parse_session_date, PriceHistory, PriceRecord, ProviderId, Symbol};

/// Reads daily histories from `{dir}/{SYMBOL}.csv`.
///
/// Files need `Date`, `Open` and `Close` columns (any case, any order, extra
/// columns ignored). An empty `Open` cell is an absent opening price. A
/// missing file is an empty history.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.as_str()))
    }
}

impl HistorySource for CsvDirectorySource {
    fn id(&self) -> ProviderId {
        ProviderId::CsvDir
    }

    fn fetch_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move {
            let path = self.path_for(&req.symbol);
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    debug!(symbol = %req.symbol, path = %path.display(), "no history file");
                    return Ok(PriceHistory::empty(req.symbol));
                }
                Err(error) => {
                    return Err(SourceError::unavailable(format!(
                        "failed to read {}: {error}",
                        path.display()
                    )));
                }
            };

            Ok(parse_history_csv(&req.symbol, &contents)?.trim_to(req.period))
        })
    }
}

struct Columns {
    date: usize,
    open: usize,
    close: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, SourceError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    SourceError::invalid_request(format!("history csv has no `{name}` column"))
                })
        };
        Ok(Self {
            date: find("date")?,
            open: find("open")?,
            close: find("close")?,
        })
    }
}

/// Parses a `Date,Open,Close` CSV body into an ordered history.
///
/// Rows that cannot be parsed are skipped with a warning; rows are sorted by
/// date and a repeated date keeps its last row.
pub fn parse_history_csv(symbol: &Symbol, contents: &str) -> Result<PriceHistory, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::invalid_request(format!("unreadable csv header: {e}")))?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                warn!(symbol = %symbol, line = line + 2, %error, "skipping unreadable csv row");
                continue;
            }
        };
        match parse_row(&row, &columns) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!(symbol = %symbol, line = line + 2, %reason, "skipping invalid csv row");
            }
        }
    }

    records.sort_by_key(|record| record.date);
    let mut deduped: Vec<PriceRecord> = Vec::with_capacity(records.len());
    for record in records {
        match deduped.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            _ => deduped.push(record),
        }
    }

    PriceHistory::new(symbol.clone(), deduped)
        .map_err(|e| SourceError::internal(format!("csv history is inconsistent: {e}")))
}

fn parse_row(row: &StringRecord, columns: &Columns) -> Result<PriceRecord, String> {
    let cell = |index: usize| row.get(index).unwrap_or("");

    let date = parse_session_date(cell(columns.date)).map_err(|e| e.to_string())?;
    let open = match cell(columns.open) {
        "" => None,
        raw => Some(parse_price(raw, "open")?),
    };
    let close = parse_price(cell(columns.close), "close")?;

    PriceRecord::new(date, open, close).map_err(|e| e.to_string())
}

fn parse_price(raw: &str, field: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("invalid {field} price `{raw}`"))
}
