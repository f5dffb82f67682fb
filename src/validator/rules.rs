//! Declarative per-column rules.
//!
//! A rule file maps column names to optional `min`, `max` and `allowed`
//! constraints:
//!
//! ```json
//! {
//!   "price": { "min": 0, "max": 1000 },
//!   "region": { "allowed": ["north", "south"] }
//! }
//! ```
//!
//! Unknown keys are ignored, so an entry without any recognized key checks
//! nothing. A file that does not exist means "no rules"; a file that exists
//! but does not have this shape fails the run.

use super::detectors::Detector;
use super::types::{ColumnKind, Dataset, Finding, IssueCategory};
use crate::error::{Result, TabcheckError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
    /// Violation when the value is below this bound
    #[serde(default)]
    pub min: Option<f64>,
    /// Violation when the value is above this bound
    #[serde(default)]
    pub max: Option<f64>,
    /// Violation when the value is not one of these
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
}

impl ColumnRule {
    pub fn is_noop(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.allowed.is_none()
    }
}

/// Column rules in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    pub columns: IndexMap<String, ColumnRule>,
}

impl RuleSet {
    /// # Errors
    ///
    /// Returns [`TabcheckError::RuleSet`] if the text is not a rule object.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| TabcheckError::RuleSet(e.to_string()))
    }
}

/// Loads the rule set at `path`, if any.
///
/// `None` or a path that does not exist yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`TabcheckError::RuleSet`] for malformed content and
/// [`TabcheckError::Io`] if an existing file cannot be read.
pub fn load_rules(path: Option<&Path>) -> Result<Option<RuleSet>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        tracing::info!("No rule file at {}, skipping rule checks", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let rules = RuleSet::from_json_str(&content).map_err(|e| match e {
        TabcheckError::RuleSet(msg) => TabcheckError::RuleSet(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!("Loaded {} column rules from {}", rules.columns.len(), path.display());
    Ok(Some(rules))
}

/// Evaluates every rule against the dataset. Each constraint of each rule
/// emits its own finding, so a row can be flagged more than once per column.
pub struct RuleViolations<'a> {
    pub rules: &'a RuleSet,
}

impl Detector for RuleViolations<'_> {
    fn name(&self) -> &'static str {
        "rule_violations"
    }

    fn detect(&self, dataset: &Dataset) -> anyhow::Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for (column, rule) in &self.rules.columns {
            let Some(kind) = dataset.kind_of(column) else {
                tracing::debug!("Rule for '{column}' ignored: no such column");
                continue;
            };
            if rule.is_noop() {
                continue;
            }

            let mut push = |label: String, mask: Vec<bool>| -> anyhow::Result<()> {
                if let Some(f) =
                    Finding::from_mask(dataset, IssueCategory::RuleViolations, label, mask)?
                {
                    findings.push(f);
                }
                Ok(())
            };

            if rule.min.is_some() || rule.max.is_some() {
                if kind == ColumnKind::Numeric {
                    let values = dataset.numeric_values(column)?;
                    if let Some(min) = rule.min {
                        let mask = values.iter().map(|v| v.is_some_and(|v| v < min)).collect();
                        push(format!("{column}_below_min"), mask)?;
                    }
                    if let Some(max) = rule.max {
                        let mask = values.iter().map(|v| v.is_some_and(|v| v > max)).collect();
                        push(format!("{column}_above_max"), mask)?;
                    }
                } else {
                    tracing::warn!("Rule for '{column}' has min/max but the column is not numeric");
                }
            }

            if let Some(allowed) = &rule.allowed {
                let mask = outside_allowed(dataset, column, kind, allowed)?;
                push(format!("{column}_invalid_value"), mask)?;
            }
        }

        Ok(findings)
    }
}

/// Missing cells are never members of the allowed set.
fn outside_allowed(
    dataset: &Dataset,
    column: &str,
    kind: ColumnKind,
    allowed: &[serde_json::Value],
) -> anyhow::Result<Vec<bool>> {
    let mask = match kind {
        ColumnKind::Numeric => {
            let permitted: Vec<f64> = allowed.iter().filter_map(serde_json::Value::as_f64).collect();
            dataset
                .numeric_values(column)?
                .into_iter()
                .map(|v| v.is_none_or(|v| !permitted.contains(&v)))
                .collect()
        }
        ColumnKind::Categorical => {
            let permitted: Vec<&str> = allowed.iter().filter_map(serde_json::Value::as_str).collect();
            let series = dataset.frame().column(column)?.as_materialized_series();
            series
                .str()?
                .into_iter()
                .map(|v| v.is_none_or(|v| !permitted.contains(&v)))
                .collect()
        }
    };
    Ok(mask)
}
