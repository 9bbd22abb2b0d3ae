//! # Domain Models
//!
//! Strongly-typed inputs of the aggregation engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated equity ticker |
//! | [`LookbackPeriod`] | History window (`1mo`, `1y`, `10y`, ...) |
//! | [`PriceRecord`] | One session: date, open, close |
//! | [`PriceHistory`] | Ordered sessions of one instrument |
//! | [`UtcDateTime`] | UTC timestamp for result metadata |
//!
//! Construction validates invariants: tickers are normalized, history dates
//! are strictly ascending, and prices are never NaN or negative on the way in.

mod history;
mod period;
mod symbol;
mod timestamp;

pub use history::{parse_session_date, PriceHistory, PriceRecord};
pub use period::LookbackPeriod;
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
