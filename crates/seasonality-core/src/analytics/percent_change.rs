use time::Date;

use crate::PriceHistory;

/// Single-session percentage change attached to its session date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentChange {
    pub date: Date,
    pub value: f64,
}

/// Percentage changes of one instrument, one entry per input record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PercentChangeSeries {
    pub changes: Vec<PercentChange>,
    /// Records whose change was undefined and replaced by zero.
    pub sanitized: usize,
}

impl PercentChangeSeries {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PercentChange> {
        self.changes.iter()
    }
}

/// `(close - open) / open * 100`, or exactly `0.0` when the open is zero or
/// absent, or the result is otherwise non-finite.
pub fn percent_change(open: Option<f64>, close: f64) -> Option<f64> {
    let open = open.filter(|open| *open != 0.0)?;
    let change = (close - open) / open * 100.0;
    change.is_finite().then_some(change)
}

/// Maps a price history to its percentage-change series.
pub fn extract(history: &PriceHistory) -> PercentChangeSeries {
    let mut sanitized = 0;
    let changes = history
        .records()
        .iter()
        .map(|record| {
            let value = percent_change(record.open, record.close).unwrap_or_else(|| {
                sanitized += 1;
                0.0
            });
            PercentChange {
                date: record.date,
                value,
            }
        })
        .collect();

    PercentChangeSeries { changes, sanitized }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use time::macros::date;

    use super::*;
    use crate::{PriceRecord, Symbol};

    #[test]
    fn computes_session_change() {
        let change = percent_change(Some(200.0), 210.0).expect("finite change");
        assert_relative_eq!(change, 5.0);
        let change = percent_change(Some(50.0), 40.0).expect("finite change");
        assert_relative_eq!(change, -20.0);
    }

    #[test]
    fn zero_or_missing_open_is_degenerate() {
        for close in [0.0, -3.5, 12.0] {
            assert_eq!(percent_change(Some(0.0), close), None);
            assert_eq!(percent_change(None, close), None);
        }
        assert_eq!(percent_change(Some(1.0), f64::INFINITY), None);
    }

    #[test]
    fn extraction_preserves_length_and_order() {
        let history = PriceHistory::new(
            Symbol::parse("IBM").expect("symbol"),
            vec![
                PriceRecord::new(date!(2024 - 01 - 02), Some(100.0), 101.0).expect("record"),
                PriceRecord::new(date!(2024 - 01 - 03), Some(0.0), 99.0).expect("record"),
                PriceRecord::new(date!(2024 - 01 - 04), None, 98.0).expect("record"),
            ],
        )
        .expect("history");

        let series = extract(&history);
        assert_eq!(series.len(), 3);
        assert_eq!(series.sanitized, 2);
        let dates: Vec<_> = series.iter().map(|change| change.date).collect();
        assert_eq!(
            dates,
            vec![date!(2024 - 01 - 02), date!(2024 - 01 - 03), date!(2024 - 01 - 04)]
        );
        assert_relative_eq!(series.changes[0].value, 1.0);
        assert_eq!(series.changes[1].value, 0.0);
        assert_eq!(series.changes[2].value, 0.0);
    }

    #[test]
    fn empty_history_yields_empty_series() {
        let history = PriceHistory::empty(Symbol::parse("XYZ").expect("symbol"));
        assert!(extract(&history).is_empty());
    }
}
