//! Integration tests for the full validation workflow
//!
//! These tests run the complete pipeline on fixture files and verify the
//! counts, the report on disk, and the flagged-rows CSV.

use std::path::{Path, PathBuf};
use tabcheck::config::{ValidationSettings, load_settings};
use tabcheck::error::TabcheckError;
use tabcheck::validator::{validate_dataset, write_flagged_csv};

fn orders() -> PathBuf {
    PathBuf::from("testdata/orders.csv")
}

fn rules() -> PathBuf {
    PathBuf::from("testdata/validation_rules.json")
}

fn settings_in(dir: &Path) -> ValidationSettings {
    ValidationSettings {
        report_dir: dir.to_path_buf(),
        ..ValidationSettings::default()
    }
}

#[test]
fn test_validate_orders_with_rules() {
    let dir = tempfile::tempdir().unwrap();
    let run = validate_dataset(&orders(), Some(&rules()), &settings_in(dir.path()))
        .expect("Validation should succeed");

    let counts: Vec<(&str, usize)> = run
        .outcome
        .counts
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("Missing Values", 2),
            ("Duplicate Rows", 1),
            ("Negative Values (quantity)", 1),
            ("Invalid Categories (region)", 1),
            ("JSON Rule Violations", 4),
        ]
    );
    assert_eq!(run.outcome.row_count, 8);
    assert_eq!(run.outcome.column_count, 4);
    assert!(run.outcome.skipped.is_empty());

    let labels: Vec<&str> = run
        .outcome
        .flagged
        .findings()
        .iter()
        .map(|f| f.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            "missing",
            "duplicate",
            "quantity_negative",
            "region_invalid_category",
            "price_above_max",
            "region_invalid_value",
            "quantity_below_min",
        ]
    );
}

#[test]
fn test_report_written_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let run = validate_dataset(&orders(), Some(&rules()), &settings_in(dir.path())).unwrap();

    assert_eq!(
        run.report_path,
        dir.path().join("validation_summary_orders.html")
    );
    let html = std::fs::read_to_string(&run.report_path).unwrap();
    assert!(html.contains("<h1>Data Validation Report</h1>"));
    assert!(html.contains("<summary>JSON Rule Violations (4 rows)</summary>"));
    assert!(html.contains("<td>region_invalid_value</td>"));
    assert!(html.contains("No Outliers found."));
    assert!(html.contains("No ML Anomalies found."));

    // No temporary file left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_missing_rule_file_skips_rule_checks() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("no_rules.json");
    let run = validate_dataset(&orders(), Some(&absent), &settings_in(dir.path())).unwrap();

    assert!(!run.outcome.counts.contains_key("JSON Rule Violations"));
    assert_eq!(run.outcome.counts.get("Missing Values"), Some(&2));
}

#[test]
fn test_malformed_rule_file_fails_before_report() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("rules.json");
    std::fs::write(&bad, r#"{"price": {"min": "zero"}}"#).unwrap();
    let report_dir = dir.path().join("reports");

    let err = validate_dataset(&orders(), Some(&bad), &settings_in(&report_dir)).unwrap_err();
    assert!(matches!(err, TabcheckError::RuleSet(_)), "got {err}");
    assert!(!report_dir.exists());
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("orders.txt");
    std::fs::copy(orders(), &txt).unwrap();

    let err = validate_dataset(&txt, None, &settings_in(dir.path())).unwrap_err();
    assert!(matches!(err, TabcheckError::InvalidPath(_)), "got {err}");
}

#[test]
fn test_issues_csv_has_source_columns_only() {
    let dir = tempfile::tempdir().unwrap();
    let run = validate_dataset(&orders(), Some(&rules()), &settings_in(dir.path())).unwrap();

    let csv_path = dir.path().join("orders_issues.csv");
    write_flagged_csv(&run.outcome.flagged, &csv_path).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("order_id,region,quantity,price"));
    assert_eq!(lines.count(), run.outcome.flagged.len());
    assert_eq!(run.outcome.flagged.len(), 9);
}

#[test]
fn test_repeated_runs_write_identical_reports() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());

    let first = validate_dataset(&orders(), Some(&rules()), &settings).unwrap();
    let first_html = std::fs::read(&first.report_path).unwrap();
    let second = validate_dataset(&orders(), Some(&rules()), &settings).unwrap();
    let second_html = std::fs::read(&second.report_path).unwrap();

    assert_eq!(first.outcome.counts, second.outcome.counts);
    assert_eq!(first_html, second_html);
}

#[test]
fn test_settings_file_controls_preview_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    std::fs::write(&config, r#"{"preview_row_limit": 1}"#).unwrap();

    let mut settings = load_settings(Some(&config)).unwrap();
    assert_eq!(settings.outlier_sigma, 3.0);
    settings.report_dir = dir.path().to_path_buf();

    let run = validate_dataset(&orders(), Some(&rules()), &settings).unwrap();
    let html = std::fs::read_to_string(&run.report_path).unwrap();
    assert!(html.contains("...and more rows not shown"));
}
