use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::{LookbackPeriod, Symbol, ValidationError};

/// One trading session: the session date with its opening and closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: Date,
    /// `None` when the provider did not report an opening price.
    pub open: Option<f64>,
    pub close: f64,
}

impl PriceRecord {
    pub fn new(date: Date, open: Option<f64>, close: f64) -> Result<Self, ValidationError> {
        if let Some(open) = open {
            if open.is_nan() {
                return Err(ValidationError::NonFiniteValue { field: "open" });
            }
            if open < 0.0 {
                return Err(ValidationError::NegativeValue { field: "open" });
            }
        }
        if close.is_nan() {
            return Err(ValidationError::NonFiniteValue { field: "close" });
        }

        Ok(Self { date, open, close })
    }
}

/// Daily price history of one instrument, ordered by ascending session date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: Symbol,
    records: Vec<PriceRecord>,
}

impl PriceHistory {
    /// Builds a history, rejecting out-of-order or duplicated session dates.
    pub fn new(symbol: Symbol, records: Vec<PriceRecord>) -> Result<Self, ValidationError> {
        if let Some(pair) = records.windows(2).find(|pair| pair[0].date >= pair[1].date) {
            return Err(ValidationError::UnorderedHistory {
                previous: pair[0].date.to_string(),
                current: pair[1].date.to_string(),
            });
        }

        Ok(Self { symbol, records })
    }

    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_date(&self) -> Option<Date> {
        self.records.last().map(|record| record.date)
    }

    /// Keeps only the sessions inside `period`, measured back from the last session.
    pub fn trim_to(mut self, period: LookbackPeriod) -> Self {
        let start = self.last_date().and_then(|end| period.start_date(end));
        if let Some(start) = start {
            self.records.retain(|record| record.date >= start);
        }
        self
    }

    /// Splits the history into two halves at `index`; both keep the same symbol.
    pub fn split_at(&self, index: usize) -> (Self, Self) {
        let index = index.min(self.records.len());
        let (head, tail) = self.records.split_at(index);
        (
            Self {
                symbol: self.symbol.clone(),
                records: head.to_vec(),
            },
            Self {
                symbol: self.symbol.clone(),
                records: tail.to_vec(),
            },
        )
    }
}

/// Parses a `YYYY-MM-DD` session date.
pub fn parse_session_date(input: &str) -> Result<Date, ValidationError> {
    let trimmed = input.trim();
    // Some exports append a time component; the session date is the prefix.
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(date_part, format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: input.to_owned(),
        }
    })
}
