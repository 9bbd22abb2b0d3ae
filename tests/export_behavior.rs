//! Behavior-driven tests for the persisted record
//!
//! These tests verify HOW an aggregation result is written to disk: the
//! three-row layout and the handling of unwritable destinations.

use seasonality_core::{export_csv, AggregateResult, ExportError};
use seasonality_tests::{
    history, symbol, AggregationPipeline, Arc, InMemoryHistorySource, LookbackPeriod,
};
use time::macros::date;

async fn two_instrument_result() -> AggregateResult {
    let source = InMemoryHistorySource::new()
        .with_history(history("AAA", &[(date!(2024 - 01 - 01), 100.0, 101.0)]))
        .with_history(history("BBB", &[(date!(2024 - 01 - 08), 100.0, 103.0)]));

    AggregationPipeline::new(Arc::new(source))
        .run(&[symbol("AAA"), symbol("BBB")], LookbackPeriod::TenYears)
        .await
        .expect("non-empty universe")
}

#[tokio::test]
async fn when_result_is_exported_file_holds_period_day_and_month_rows() {
    // Given: A finished aggregation and a temporary directory
    let result = two_instrument_result().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("stocks_file.csv");

    // When: The persisted record is written
    export_csv(&result, &path).expect("writable path");

    // Then: The file has the period row, six day values and twelve month values
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .expect("readable export");
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("valid csv");

    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "10y");
    assert_eq!(rows[1].len(), 6);
    assert_eq!(rows[2].len(), 12);

    let monday: f64 = rows[1][0].parse().expect("numeric day value");
    approx::assert_relative_eq!(monday, 2.0, epsilon = 1e-9);
    let january: f64 = rows[2][0].parse().expect("numeric month value");
    approx::assert_relative_eq!(january, 2.0, epsilon = 1e-9);
}

#[tokio::test]
async fn when_destination_is_unwritable_export_fails_with_io_error() {
    // Given: A path inside a directory that does not exist
    let result = two_instrument_result().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing").join("stocks_file.csv");

    // When: The record is exported
    let error = export_csv(&result, &path).expect_err("parent directory is missing");

    // Then: The failure surfaces as an I/O export error
    assert!(matches!(error, ExportError::Io(_)));
}
