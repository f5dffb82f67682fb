use super::types::{
    Dataset, Finding, FlaggedRows, IssueCounts, SkippedDetector, ValidationOutcome,
};

/// Merges detector findings into the run's flagged rows and issue counts.
///
/// Findings are ordered by report section; within a section the detector's
/// own order (column order) is kept. Empty findings are dropped, so every
/// category in the counts has at least one row.
pub fn aggregate(
    dataset: &Dataset,
    findings: Vec<Finding>,
    skipped: Vec<SkippedDetector>,
) -> ValidationOutcome {
    let mut findings: Vec<Finding> = findings.into_iter().filter(|f| !f.is_empty()).collect();
    findings.sort_by_key(|f| f.category.section());

    let mut counts = IssueCounts::new();
    for finding in &findings {
        *counts.entry(finding.category.to_string()).or_insert(0) += finding.len();
    }

    ValidationOutcome {
        flagged: FlaggedRows::new(findings, dataset.frame().clear()),
        counts,
        skipped,
        row_count: dataset.height(),
        column_count: dataset.width(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationSettings;
    use crate::validator::types::IssueCategory;
    use polars::prelude::*;

    fn dataset() -> anyhow::Result<Dataset> {
        let df = df!("a" => ["1", "2", "3"], "b" => ["x", "y", "z"])?;
        Ok(Dataset::from_frame(df, &ValidationSettings::default())?)
    }

    #[test]
    fn test_counts_follow_section_order_and_sum_rules() -> anyhow::Result<()> {
        let ds = dataset()?;
        let findings = vec![
            Finding::new(&ds, IssueCategory::RuleViolations, "a_below_min", vec![0])?,
            Finding::new(&ds, IssueCategory::NegativeValues("a".into()), "a_negative", vec![1])?,
            Finding::new(&ds, IssueCategory::RuleViolations, "a_above_max", vec![0, 2])?,
            Finding::new(&ds, IssueCategory::MissingValues, "missing", vec![2])?,
            Finding::new(&ds, IssueCategory::DuplicateRows, "duplicate", vec![])?,
        ];

        let outcome = aggregate(&ds, findings, Vec::new());
        let keys: Vec<&str> = outcome.counts.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["Missing Values", "Negative Values (a)", "JSON Rule Violations"]
        );
        assert_eq!(outcome.counts.get("JSON Rule Violations"), Some(&3));
        assert_eq!(outcome.flagged.len(), 5);
        assert_eq!(outcome.flagged.distinct_row_count(), 3);
        Ok(())
    }

    #[test]
    fn test_labeled_frame_keeps_repeated_rows() -> anyhow::Result<()> {
        let ds = dataset()?;
        let findings = vec![
            Finding::new(&ds, IssueCategory::MissingValues, "missing", vec![1])?,
            Finding::new(&ds, IssueCategory::Outliers("a".into()), "a_outlier", vec![1])?,
        ];
        let outcome = aggregate(&ds, findings, Vec::new());

        let frame = outcome.flagged.to_frame()?;
        assert_eq!(frame.height(), 2);
        let labels: Vec<Option<&str>> = frame
            .column("issue")?
            .as_materialized_series()
            .str()?
            .into_iter()
            .collect();
        assert_eq!(labels, vec![Some("missing"), Some("a_outlier")]);
        Ok(())
    }

    #[test]
    fn test_no_findings_yields_empty_outcome() -> anyhow::Result<()> {
        let ds = dataset()?;
        let outcome = aggregate(&ds, Vec::new(), Vec::new());
        assert!(!outcome.has_issues());
        assert!(outcome.flagged.is_empty());
        assert_eq!(outcome.flagged.to_frame()?.width(), 3);
        Ok(())
    }
}
