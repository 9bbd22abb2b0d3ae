use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use seasonality_core::{
    export_csv, AggregateResult, AggregationPipeline, CsvDirectorySource, HistorySource,
    ProviderId, ReqwestHttpClient, Symbol, ValidationError, YahooHistorySource,
};
use tracing::{info, warn};

use crate::cli::AnalyzeArgs;
use crate::config::{AnalysisConfig, ConfigError};
use crate::error::CliError;

pub async fn run(args: &AnalyzeArgs, config: &AnalysisConfig) -> Result<AggregateResult, CliError> {
    let universe = load_universe(&args.symbols, args.symbols_file.as_deref())?;
    let source = build_source(config)?;

    let pipeline = AggregationPipeline::new(source).with_config(config.pipeline_config());
    let cancellation = pipeline.cancellation_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling analysis");
            cancellation.cancel();
        }
    });

    let outcome = pipeline.run(&universe, config.period).await;
    interrupt.abort();
    let result = outcome?;

    if let Some(path) = &args.export {
        export_csv(&result, path)?;
        info!(path = %path.display(), "persisted record written");
    }

    Ok(result)
}

fn build_source(config: &AnalysisConfig) -> Result<Arc<dyn HistorySource>, ConfigError> {
    match config.source {
        ProviderId::Yahoo => Ok(Arc::new(
            YahooHistorySource::new(Arc::new(ReqwestHttpClient::new()))
                .with_retry(config.retry_policy())
                .with_timeout_ms(duration_ms(config.request_timeout())),
        )),
        ProviderId::CsvDir => {
            let dir = config.data_dir.as_ref().ok_or(ConfigError::MissingDataDir)?;
            Ok(Arc::new(CsvDirectorySource::new(dir)))
        }
        ProviderId::Memory => Err(ConfigError::UnsupportedSource(config.source)),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Positional symbols followed by the symbols file, in order of appearance.
fn load_universe(symbols: &[String], symbols_file: Option<&Path>) -> Result<Vec<Symbol>, CliError> {
    let mut universe = symbols
        .iter()
        .map(|raw| Symbol::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(path) = symbols_file {
        let contents = std::fs::read_to_string(path)?;
        universe.extend(parse_symbols(&contents)?);
    }

    Ok(universe)
}

/// One ticker per line; blank lines and `#` comments are ignored.
fn parse_symbols(contents: &str) -> Result<Vec<Symbol>, ValidationError> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(Symbol::parse)
        .collect()
}
