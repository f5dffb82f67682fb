//! Row-level quality checks.
//!
//! Every detector reads the shared, already-normalized [`Dataset`] and
//! returns its own findings; nothing is accumulated across detectors. The
//! run order of [`standard_set`] is the order categories appear in the
//! Issue Counts.

use super::ml::MlAnomalies;
use super::rules::{RuleSet, RuleViolations};
use super::types::{Dataset, Finding, IssueCategory};
use crate::config::ValidationSettings;
use anyhow::Result;
use polars::prelude::*;
use std::collections::HashSet;

pub trait Detector {
    /// Short name used in logs and in the skipped-detector list.
    fn name(&self) -> &'static str;

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>>;
}

/// The detectors of one validation run, in reporting order.
///
/// The rule detector is only present when a rule set was loaded.
pub fn standard_set<'a>(
    settings: &'a ValidationSettings,
    rules: Option<&'a RuleSet>,
) -> Vec<Box<dyn Detector + 'a>> {
    let mut detectors: Vec<Box<dyn Detector + 'a>> = vec![
        Box::new(MissingValues),
        Box::new(DuplicateRows),
        Box::new(NegativeValues),
        Box::new(Outliers {
            sigma: settings.outlier_sigma,
        }),
        Box::new(InvalidCategories),
        Box::new(MlAnomalies {
            settings: &settings.anomaly,
        }),
    ];
    if let Some(rules) = rules {
        detectors.push(Box::new(RuleViolations { rules }));
    }
    detectors
}

/// Rows with at least one missing cell.
pub struct MissingValues;

impl Detector for MissingValues {
    fn name(&self) -> &'static str {
        "missing_values"
    }

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>> {
        let mut any_missing = vec![false; dataset.height()];
        for column in dataset.column_names() {
            for (row, missing) in any_missing.iter_mut().zip(dataset.null_mask(&column)?) {
                *row |= missing;
            }
        }
        let finding =
            Finding::from_mask(dataset, IssueCategory::MissingValues, "missing", any_missing)?;
        Ok(finding.into_iter().collect())
    }
}

/// Repeats of an earlier identical row. The first occurrence stays unflagged.
pub struct DuplicateRows;

impl Detector for DuplicateRows {
    fn name(&self) -> &'static str {
        "duplicate_rows"
    }

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>> {
        let keys = dataset.row_keys(&dataset.column_names())?;
        let mut seen = HashSet::with_capacity(keys.len());
        let repeats = keys.into_iter().map(|key| !seen.insert(key));
        let finding =
            Finding::from_mask(dataset, IssueCategory::DuplicateRows, "duplicate", repeats)?;
        Ok(finding.into_iter().collect())
    }
}

/// Numeric values strictly below zero, one finding per column.
pub struct NegativeValues;

impl Detector for NegativeValues {
    fn name(&self) -> &'static str {
        "negative_values"
    }

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for column in dataset.numeric_columns() {
            let mask = dataset
                .numeric_values(&column)?
                .into_iter()
                .map(|v| v.is_some_and(|v| v < 0.0));
            let label = format!("{column}_negative");
            if let Some(f) =
                Finding::from_mask(dataset, IssueCategory::NegativeValues(column), label, mask)?
            {
                findings.push(f);
            }
        }
        Ok(findings)
    }
}

/// Values more than `sigma` sample standard deviations from the column mean.
pub struct Outliers {
    pub sigma: f64,
}

impl Detector for Outliers {
    fn name(&self) -> &'static str {
        "outliers"
    }

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for column in dataset.numeric_columns() {
            let ca = dataset.numeric_chunked(&column)?;
            let (Some(mean), Some(std)) = (ca.mean(), ca.std(1)) else {
                continue;
            };
            if !std.is_finite() || std <= 0.0 {
                continue;
            }

            let upper = mean + self.sigma * std;
            let lower = mean - self.sigma * std;
            let mask = ca
                .into_iter()
                .map(|v| v.is_some_and(|v| v > upper || v < lower));
            let label = format!("{column}_outlier");
            if let Some(f) =
                Finding::from_mask(dataset, IssueCategory::Outliers(column), label, mask)?
            {
                findings.push(f);
            }
        }
        Ok(findings)
    }
}

/// Missing cells in text columns, reported per column.
///
/// This overlaps with [`MissingValues`] on purpose: that one answers "which
/// rows are incomplete", this one answers "which columns are".
pub struct InvalidCategories;

impl Detector for InvalidCategories {
    fn name(&self) -> &'static str {
        "invalid_categories"
    }

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for column in dataset.categorical_columns() {
            let mask = dataset.null_mask(&column)?;
            let label = format!("{column}_invalid_category");
            if let Some(f) = Finding::from_mask(
                dataset,
                IssueCategory::InvalidCategories(column),
                label,
                mask,
            )? {
                findings.push(f);
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outliers_beyond_three_sample_std() -> Result<()> {
        let mut values = vec!["10"; 20];
        values.push("100");
        values.push("NA");
        let df = df!("v" => values)?;
        let ds = Dataset::from_frame(df, &ValidationSettings::default())?;

        let findings = Outliers { sigma: 3.0 }.detect(&ds)?;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].row_indices, vec![20]);
        assert_eq!(findings[0].category, IssueCategory::Outliers("v".into()));

        assert!(Outliers { sigma: 5.0 }.detect(&ds)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_rule_detector_only_with_rules() {
        let settings = ValidationSettings::default();
        let names: Vec<&str> = standard_set(&settings, None).iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                "missing_values",
                "duplicate_rows",
                "negative_values",
                "outliers",
                "invalid_categories",
                "ml_anomalies"
            ]
        );

        let rules = RuleSet::default();
        let with_rules = standard_set(&settings, Some(&rules));
        assert_eq!(with_rules.last().map(|d| d.name()), Some("rule_violations"));
    }
}
