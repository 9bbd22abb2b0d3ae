//! History source adapters.

mod csv_dir;
mod yahoo;

pub use csv_dir::{parse_history_csv, CsvDirectorySource};
pub use yahoo::{parse_chart, YahooHistorySource};
