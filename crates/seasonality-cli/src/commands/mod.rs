mod analyze;
pub mod labels;

use seasonality_core::AggregateResult;

pub use labels::SchemeLabels;

use crate::cli::{AnalyzeArgs, Cli, Command};
use crate::config::{build_config, ConfigOverrides};
use crate::error::CliError;
use crate::logging;

pub enum CommandOutput {
    Analysis(Box<AggregateResult>),
    Labels(Vec<SchemeLabels>),
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    match &cli.command {
        Command::Analyze(args) => {
            let config = build_config(&overrides(cli, args))?;
            logging::init(config.log_level);
            let result = analyze::run(args, &config).await?;
            Ok(CommandOutput::Analysis(Box::new(result)))
        }
        Command::Labels => {
            logging::init(cli.log_level.unwrap_or_default());
            Ok(CommandOutput::Labels(labels::run()))
        }
    }
}

fn overrides(cli: &Cli, args: &AnalyzeArgs) -> ConfigOverrides {
    ConfigOverrides {
        config_file: cli.config.clone(),
        period: args.period,
        source: args.source,
        data_dir: args.data_dir.clone(),
        concurrency: args.concurrency,
        timeout_ms: args.timeout_ms,
        rate_limit_per_minute: args.rate_limit_per_minute,
        max_retries: args.max_retries,
        divisor: args.divisor,
        log_level: cli.log_level,
    }
}
