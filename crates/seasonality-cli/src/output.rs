use std::fmt::Write as _;

use seasonality_core::{AggregateResult, BucketScheme};

use crate::cli::OutputFormat;
use crate::commands::{CommandOutput, SchemeLabels};
use crate::error::CliError;

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let payload = match (output, format) {
        (CommandOutput::Analysis(result), OutputFormat::Json) => to_json(result.as_ref(), pretty)?,
        (CommandOutput::Labels(schemes), OutputFormat::Json) => to_json(schemes, pretty)?,
        (CommandOutput::Analysis(result), OutputFormat::Table) => analysis_table(result),
        (CommandOutput::Labels(schemes), OutputFormat::Table) => labels_table(schemes),
    };
    println!("{payload}");
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(payload)
}

fn analysis_table(result: &AggregateResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "period      : {}", result.period);
    let _ = writeln!(out, "divisor     : {}", result.divisor);
    let _ = writeln!(
        out,
        "instruments : {} requested, {} considered",
        result.requested, result.considered
    );
    let _ = writeln!(out, "generated_at: {}", result.generated_at);

    for scheme in BucketScheme::ALL {
        let average = result.scheme(scheme);
        let _ = writeln!(
            out,
            "\n{} ({}/{} included)",
            scheme, average.included, average.considered
        );
        match &average.values {
            Some(values) => {
                for (label, value) in average.labels.iter().zip(values) {
                    let _ = writeln!(out, "  {label:<10} {value:>10.4}");
                }
            }
            None => {
                let _ = writeln!(out, "  unavailable: every instrument was excluded");
            }
        }
    }

    let report = &result.report;
    if report.skipped() > 0 {
        let _ = writeln!(out, "\nskipped:");
        for symbol in &report.empty_histories {
            let _ = writeln!(out, "  - {symbol}: empty history");
        }
        for failed in &report.failed {
            let _ = writeln!(out, "  - {}: {} {}", failed.symbol, failed.code, failed.message);
        }
    }
    if !report.exclusions.is_empty() {
        let _ = writeln!(out, "\nexcluded (non-finite):");
        for exclusion in &report.exclusions {
            let _ = writeln!(out, "  - {} from {}", exclusion.symbol, exclusion.scheme);
        }
    }
    if report.dropped_records > 0 || report.sanitized_records > 0 {
        let _ = writeln!(
            out,
            "\nrecords: {} without a slot, {} with an undefined change",
            report.dropped_records, report.sanitized_records
        );
    }

    out.trim_end().to_owned()
}

fn labels_table(schemes: &[SchemeLabels]) -> String {
    let mut out = String::new();
    for scheme in schemes {
        let _ = writeln!(
            out,
            "{:<14} {:>2} slots  {}",
            scheme.name,
            scheme.slots,
            scheme.labels.join(", ")
        );
    }
    out.trim_end().to_owned()
}
