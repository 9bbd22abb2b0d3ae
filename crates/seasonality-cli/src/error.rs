use seasonality_core::AggregationError;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] seasonality_core::ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("export failed: {0}")]
    Export(#[from] seasonality_core::ExportError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::Aggregation(AggregationError::Cancelled) => 130,
            Self::Aggregation(_) => 3,
            Self::Serialization(_) => 4,
            Self::Export(_) => 10,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_failures_to_exit_codes() {
        assert_eq!(CliError::from(AggregationError::EmptyUniverse).exit_code(), 3);
        assert_eq!(CliError::from(AggregationError::Cancelled).exit_code(), 130);
        assert_eq!(CliError::from(ConfigError::MissingDataDir).exit_code(), 2);
    }
}
