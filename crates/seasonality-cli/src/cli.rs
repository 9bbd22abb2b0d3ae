//! CLI argument definitions for seasonality.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Fetch a universe and print its seasonality averages |
//! | `labels` | List the bucket schemes with their slot labels |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | TOML configuration file |
//! | `--log-level` | `info` | Diagnostics level on stderr |
//!
//! Every analysis option can also be set in the config file or through a
//! `SEASONALITY_*` environment variable; flags win over the environment,
//! which wins over the file.
//!
//! # Examples
//!
//! ```bash
//! # Ten years of daily history for three tickers
//! seasonality analyze AAPL MSFT SPY --pretty
//!
//! # Local CSV files, table output, persisted record
//! seasonality analyze --symbols-file universe.txt --source csv-dir --data-dir ./prices \
//!     --format table --export stocks_file.csv
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use seasonality_core::{DivisorPolicy, LookbackPeriod, ProviderId};

use crate::config::LogLevel;

/// Calendar seasonality of daily price changes across a universe of tickers.
#[derive(Debug, Parser)]
#[command(
    name = "seasonality",
    author,
    version,
    about = "Calendar seasonality of daily price changes",
    long_about = "Averages each instrument's daily open-to-close percentage changes by \
weekday, ISO week and month, then averages those profiles across the universe.\n\
\n\
Use 'seasonality <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// TOML configuration file.
    #[arg(long, global = true, env = "SEASONALITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Diagnostics level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[arg(long, global = true, env = "SEASONALITY_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object output.
    Json,
    /// Aligned text for terminal display.
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch histories and compute the cross-sectional seasonality averages.
    Analyze(AnalyzeArgs),
    /// List bucket schemes, slot counts and labels.
    Labels,
}

#[derive(Debug, Clone, Default, Args)]
pub struct AnalyzeArgs {
    /// Ticker symbols to analyze.
    pub symbols: Vec<String>,

    /// File with one ticker per line; `#` starts a comment.
    #[arg(long)]
    pub symbols_file: Option<PathBuf>,

    /// Lookback period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    #[arg(long, env = "SEASONALITY_PERIOD")]
    pub period: Option<LookbackPeriod>,

    /// History source: yahoo or csv-dir.
    #[arg(long, env = "SEASONALITY_SOURCE")]
    pub source: Option<ProviderId>,

    /// Directory of `{SYMBOL}.csv` files for the csv-dir source.
    #[arg(long, env = "SEASONALITY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write the period/day/month record to this CSV file.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Average divisor: total (every instrument with data) or included.
    #[arg(long, env = "SEASONALITY_DIVISOR")]
    pub divisor: Option<DivisorPolicy>,

    /// Maximum concurrent history lookups.
    #[arg(long, env = "SEASONALITY_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Per-instrument lookup timeout in milliseconds.
    #[arg(long, env = "SEASONALITY_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum lookups per minute; 0 disables the limit.
    #[arg(long, env = "SEASONALITY_RATE_LIMIT_PER_MINUTE")]
    pub rate_limit_per_minute: Option<u32>,

    /// Retries per upstream request.
    #[arg(long, env = "SEASONALITY_MAX_RETRIES")]
    pub max_retries: Option<u32>,
}
