//! Analysis configuration.
//!
//! Resolved from, lowest to highest priority: built-in defaults, the TOML
//! file given with `--config`, `SEASONALITY_*` environment variables and
//! command-line flags. The last two are merged by clap before they reach
//! [`build_config`].

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use seasonality_core::{
    DivisorPolicy, LookbackPeriod, PipelineConfig, ProviderId, RetryPolicy, ValidationError,
};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("source '{0}' cannot be used from the command line; use yahoo or csv-dir")]
    UnsupportedSource(ProviderId),

    #[error("the csv-dir source needs a data directory (--data-dir or `data_dir`)")]
    MissingDataDir,

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Diagnostics verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Settings of one `analyze` run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(deserialize_with = "from_str_value")]
    pub period: LookbackPeriod,
    #[serde(deserialize_with = "from_str_value")]
    pub source: ProviderId,
    pub data_dir: Option<PathBuf>,
    /// `None` uses the available parallelism.
    pub concurrency: Option<usize>,
    pub timeout_ms: u64,
    /// Zero disables the limit.
    pub rate_limit_per_minute: u32,
    pub max_retries: u32,
    #[serde(deserialize_with = "from_str_value")]
    pub divisor: DivisorPolicy,
    #[serde(deserialize_with = "from_str_value")]
    pub log_level: LogLevel,
}

fn from_str_value<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period: LookbackPeriod::default(),
            source: ProviderId::Yahoo,
            data_dir: None,
            concurrency: None,
            timeout_ms: 30_000,
            rate_limit_per_minute: 0,
            max_retries: 3,
            divisor: DivisorPolicy::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!("failed to read {}: {e}", path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            ProviderId::Memory => return Err(ConfigError::UnsupportedSource(self.source)),
            ProviderId::CsvDir if self.data_dir.is_none() => return Err(ConfigError::MissingDataDir),
            _ => {}
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "timeout_ms",
            });
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::ZeroValue {
                field: "concurrency",
            });
        }
        Ok(())
    }

    /// Overlay explicitly given values (CLI takes precedence)
    pub fn merge(&mut self, overrides: &ConfigOverrides) {
        if let Some(period) = overrides.period {
            self.period = period;
        }
        if let Some(source) = overrides.source {
            self.source = source;
        }
        if let Some(data_dir) = &overrides.data_dir {
            self.data_dir = Some(data_dir.clone());
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = Some(concurrency);
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(limit) = overrides.rate_limit_per_minute {
            self.rate_limit_per_minute = limit;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(divisor) = overrides.divisor {
            self.divisor = divisor;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_retries(self.max_retries)
    }

    /// Timeout of one upstream request. `timeout_ms` bounds the whole lookup,
    /// so every retry and the backoff between them must fit inside it.
    pub fn request_timeout(&self) -> Duration {
        self.retry_policy()
            .attempt_timeout(Duration::from_millis(self.timeout_ms))
    }

    /// Engine settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_divisor(self.divisor)
            .with_rate_limit_per_minute(self.rate_limit_per_minute);
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        config
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub period: Option<LookbackPeriod>,
    pub source: Option<ProviderId>,
    pub data_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub rate_limit_per_minute: Option<u32>,
    pub max_retries: Option<u32>,
    pub divisor: Option<DivisorPolicy>,
    pub log_level: Option<LogLevel>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments and environment variables
/// 2. Config file
/// 3. Default values
pub fn build_config(overrides: &ConfigOverrides) -> Result<AnalysisConfig, ConfigError> {
    let mut config = match &overrides.config_file {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    config.merge(overrides);
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_default_config() {
        let config = build_config(&ConfigOverrides::default()).expect("defaults are valid");
        assert_eq!(config.period, LookbackPeriod::TenYears);
        assert_eq!(config.source, ProviderId::Yahoo);
        assert_eq!(config.divisor, DivisorPolicy::TotalConsidered);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.pipeline_config().rate_limit_per_minute(), None);
    }

    #[test]
    fn test_file_values_apply() {
        let file = config_file(
            "period = \"5y\"\nsource = \"csv-dir\"\ndata_dir = \"/tmp/prices\"\n\
             divisor = \"included\"\nrate_limit_per_minute = 120\nlog_level = \"debug\"\n",
        );
        let config = build_config(&ConfigOverrides {
            config_file: Some(file.path().to_path_buf()),
            ..ConfigOverrides::default()
        })
        .expect("valid file");

        assert_eq!(config.period, LookbackPeriod::FiveYears);
        assert_eq!(config.source, ProviderId::CsvDir);
        assert_eq!(config.divisor, DivisorPolicy::IncludedOnly);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.pipeline_config().rate_limit_per_minute(), Some(120));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = config_file("period = \"5y\"\nconcurrency = 2\n");
        let config = build_config(&ConfigOverrides {
            config_file: Some(file.path().to_path_buf()),
            period: Some(LookbackPeriod::OneYear),
            ..ConfigOverrides::default()
        })
        .expect("valid config");

        assert_eq!(config.period, LookbackPeriod::OneYear);
        assert_eq!(config.pipeline_config().concurrency(), 2);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let file = config_file("period = \"7y\"\n");
        let err = build_config(&ConfigOverrides {
            config_file: Some(file.path().to_path_buf()),
            ..ConfigOverrides::default()
        })
        .expect_err("unknown period");
        assert!(matches!(err, ConfigError::FileError(_)));
    }

    #[test]
    fn test_csv_dir_requires_data_dir() {
        let err = build_config(&ConfigOverrides {
            source: Some(ProviderId::CsvDir),
            ..ConfigOverrides::default()
        })
        .expect_err("missing data dir");
        assert!(matches!(err, ConfigError::MissingDataDir));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = build_config(&ConfigOverrides {
            timeout_ms: Some(0),
            ..ConfigOverrides::default()
        })
        .expect_err("zero timeout");
        assert!(matches!(err, ConfigError::ZeroValue { field: "timeout_ms" }));
    }

    #[test]
    fn test_request_timeout_leaves_room_for_retries() {
        let config = build_config(&ConfigOverrides::default()).expect("defaults are valid");
        let lookup = Duration::from_millis(config.timeout_ms);
        let request = config.request_timeout();
        let attempts = config.max_retries + 1;

        assert!(request < lookup);
        assert!(request * attempts + config.retry_policy().max_total_backoff() <= lookup);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").expect("valid"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("warning").expect("valid"), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }
}
