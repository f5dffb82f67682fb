use super::aggregate::aggregate;
use super::detectors::{Detector, standard_set};
use super::io::load_dataset;
use super::report::render_html;
use super::rules::{RuleSet, load_rules};
use super::types::{Dataset, Finding, SkippedDetector, ValidationOutcome};
use crate::config::ValidationSettings;
use crate::error::{Result, ResultExt as _, TabcheckError};
use crate::utils::write_atomic;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A finished validation run and where its report went.
#[derive(Debug, Clone)]
pub struct ValidationRun {
    pub outcome: ValidationOutcome,
    pub report_path: PathBuf,
}

/// Validates the CSV at `path` and writes its HTML report.
///
/// Loading errors (dataset or rule file) abort the run before any detector
/// starts. A detector that fails on its own is recorded in
/// [`ValidationOutcome::skipped`] and the others carry on.
///
/// # Errors
///
/// Returns an error if the dataset or rule file cannot be loaded, or if the
/// report cannot be written.
pub fn validate_dataset(
    path: &Path,
    rules_path: Option<&Path>,
    settings: &ValidationSettings,
) -> Result<ValidationRun> {
    let start = Instant::now();
    tracing::info!("Validating {}", path.display());

    let dataset = load_dataset(path, settings)?;
    let rules = load_rules(rules_path)?;
    let outcome = validate_frame(&dataset, rules.as_ref(), settings);

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let html = render_html(&outcome, &source_name, settings.preview_row_limit)
        .context("Failed to render report")?;

    let report_path = report_path_for(path, &settings.report_dir)?;
    write_atomic(&report_path, html.as_bytes())
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;

    tracing::info!(
        "Report written to {} in {:.2?}",
        report_path.display(),
        start.elapsed()
    );
    Ok(ValidationRun {
        outcome,
        report_path,
    })
}

/// Runs every detector over an already loaded dataset.
pub fn validate_frame(
    dataset: &Dataset,
    rules: Option<&RuleSet>,
    settings: &ValidationSettings,
) -> ValidationOutcome {
    let (findings, skipped) = run_detectors(standard_set(settings, rules), dataset);

    let outcome = aggregate(dataset, findings, skipped);
    for (category, count) in &outcome.counts {
        tracing::info!("{category}: {count}");
    }
    if !outcome.has_issues() {
        tracing::info!("No issues found");
    }
    outcome
}

/// Runs each detector in turn. One that fails is logged and listed as
/// skipped; the rest still run.
pub fn run_detectors<'a>(
    detectors: impl IntoIterator<Item = Box<dyn Detector + 'a>>,
    dataset: &Dataset,
) -> (Vec<Finding>, Vec<SkippedDetector>) {
    let mut findings = Vec::new();
    let mut skipped = Vec::new();

    for detector in detectors {
        match run_detector(detector.as_ref(), dataset) {
            Ok(mut found) => findings.append(&mut found),
            Err(e) => {
                tracing::warn!("Detector '{}' skipped: {e:#}", detector.name());
                skipped.push(SkippedDetector {
                    detector: detector.name().to_owned(),
                    reason: format!("{e:#}"),
                });
            }
        }
    }
    (findings, skipped)
}

fn run_detector(detector: &dyn Detector, dataset: &Dataset) -> anyhow::Result<Vec<Finding>> {
    let start = Instant::now();
    let findings = detector.detect(dataset)?;
    tracing::debug!(
        "{} produced {} findings in {:.2?}",
        detector.name(),
        findings.len(),
        start.elapsed()
    );
    Ok(findings)
}

/// `<report_dir>/validation_summary_<file stem>.html`
pub fn report_path_for(dataset_path: &Path, report_dir: &Path) -> Result<PathBuf> {
    let stem = dataset_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            TabcheckError::InvalidPath(format!(
                "Cannot derive a report name from {}",
                dataset_path.display()
            ))
        })?;
    Ok(report_dir.join(format!("validation_summary_{stem}.html")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_path_uses_file_stem() -> Result<()> {
        let path = report_path_for(Path::new("data/sales_2024.csv"), Path::new("out"))?;
        assert_eq!(path, PathBuf::from("out/validation_summary_sales_2024.html"));
        Ok(())
    }

    #[test]
    fn test_report_path_rejects_nameless_input() {
        assert!(report_path_for(Path::new("/"), Path::new("out")).is_err());
    }
}
