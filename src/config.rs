use crate::error::{Result, TabcheckError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment override for [`ValidationSettings::report_dir`].
pub const REPORT_DIR_ENV: &str = "TABCHECK_REPORT_DIR";

/// Markers a validation run always treats as missing.
pub const VALIDATION_MISSING_MARKERS: [&str; 4] = ["", "NA", "N/A", "-"];

/// Null spellings the CSV reader recognises before validation sees a cell.
pub const READER_NULL_MARKERS: [&str; 16] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Rule file the CLI falls back to when `--rules` is not given.
pub const DEFAULT_RULES_PATH: &str = "data/validation_rules.json";

/// Tuning for the unsupervised anomaly detector.
///
/// These are fixed so that two runs over the same file flag the same rows.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnomalySettings {
    /// Expected fraction of anomalous rows, shared by both algorithms
    pub contamination: f64,
    /// Seed for the isolation forest subsampling and splits
    pub seed: u64,
    /// Neighbourhood size for the local outlier factor
    pub neighbors: usize,
    /// Number of isolation trees
    pub estimators: usize,
    /// Rows drawn per isolation tree (capped at the row count)
    pub max_samples: usize,
}

impl Default for AnomalySettings {
    fn default() -> Self {
        Self {
            contamination: 0.01,
            seed: 42,
            neighbors: 20,
            estimators: 100,
            max_samples: 256,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
    /// Cell values treated as missing (whitespace-only cells always are)
    pub missing_markers: Vec<String>,
    /// Distance from the mean, in standard deviations, beyond which a value is an outlier
    pub outlier_sigma: f64,
    /// Example rows shown per report section and per preview group
    pub preview_row_limit: usize,
    /// Directory the HTML report is written to
    pub report_dir: PathBuf,
    pub anomaly: AnomalySettings,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            missing_markers: VALIDATION_MISSING_MARKERS
                .iter()
                .chain(&READER_NULL_MARKERS)
                .map(|m| (*m).to_owned())
                .collect(),
            outlier_sigma: 3.0,
            preview_row_limit: 5,
            report_dir: PathBuf::from("reports"),
            anomaly: AnomalySettings::default(),
        }
    }
}

impl ValidationSettings {
    /// Applies environment overrides on top of file or default values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(REPORT_DIR_ENV)
            && !dir.trim().is_empty()
        {
            self.report_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn is_missing_marker(&self, cell: &str) -> bool {
        cell.trim().is_empty() || self.missing_markers.iter().any(|m| m == cell)
    }
}

/// Loads settings from a JSON file.
///
/// A missing file yields the defaults. Fields absent from the file keep
/// their default values.
///
/// # Errors
///
/// Returns [`TabcheckError::Config`] if the file exists but is not valid settings JSON.
pub fn load_settings(path: Option<&Path>) -> Result<ValidationSettings> {
    let settings = match path {
        Some(p) if p.exists() => {
            let content = std::fs::read_to_string(p)?;
            serde_json::from_str::<ValidationSettings>(&content).map_err(|e| {
                TabcheckError::Config(format!("{}: {e}", p.display()))
            })?
        }
        Some(p) => {
            tracing::debug!("Settings file {} not found, using defaults", p.display());
            ValidationSettings::default()
        }
        None => ValidationSettings::default(),
    };
    Ok(settings.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let s = ValidationSettings::default();
        assert_eq!(s.anomaly.contamination, 0.01);
        assert_eq!(s.anomaly.seed, 42);
        assert_eq!(s.anomaly.neighbors, 20);
        assert_eq!(s.preview_row_limit, 5);
        assert_eq!(&s.missing_markers[..4], ["", "NA", "N/A", "-"]);
        assert_eq!(s.missing_markers.len(), 20);
    }

    #[test]
    fn test_missing_marker_detection() {
        let s = ValidationSettings::default();
        assert!(s.is_missing_marker("NA"));
        assert!(s.is_missing_marker("   "));
        assert!(s.is_missing_marker("\t"));
        assert!(s.is_missing_marker("NaN"));
        assert!(s.is_missing_marker("null"));
        assert!(s.is_missing_marker("#N/A"));
        assert!(!s.is_missing_marker("na"));
        assert!(!s.is_missing_marker("Null"));
        assert!(!s.is_missing_marker("0"));
    }

    #[test]
    fn test_partial_settings_file_keeps_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"outlier_sigma": 2.5, "anomaly": {"seed": 7}}"#)?;

        let s = load_settings(Some(&path))?;
        assert_eq!(s.outlier_sigma, 2.5);
        assert_eq!(s.anomaly.seed, 7);
        assert_eq!(s.anomaly.neighbors, 20);
        assert_eq!(s.preview_row_limit, 5);
        Ok(())
    }

    #[test]
    fn test_malformed_settings_file_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"outlier_sigma": "three"}"#)?;

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, TabcheckError::Config(_)));
        Ok(())
    }
}
