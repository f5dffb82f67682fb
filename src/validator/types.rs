use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Name of the label column added by [`FlaggedRows::to_frame`].
pub const ISSUE_COLUMN: &str = "issue";

/// Human-readable category name to flagged row count, in detection order.
pub type IssueCounts = IndexMap<String, usize>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::Categorical => "Categorical",
        }
    }
}

/// A normalized dataset: numeric columns are `Int64` or `Float64`, everything
/// else is `String`, and every missing marker has become a null.
///
/// Build one with [`super::io::load_dataset`] or [`Dataset::from_frame`];
/// both go through the same normalization.
#[derive(Clone, Debug)]
pub struct Dataset {
    frame: DataFrame,
    kinds: Vec<ColumnKind>,
}

impl Dataset {
    pub(crate) fn from_parts(frame: DataFrame, kinds: Vec<ColumnKind>) -> Self {
        debug_assert_eq!(frame.width(), kinds.len(), "one kind per column");
        Self { frame, kinds }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.frame
            .get_column_index(column)
            .and_then(|i| self.kinds.get(i).copied())
    }

    /// Columns of the given kind, in dataset order.
    pub fn columns_of(&self, kind: ColumnKind) -> Vec<String> {
        self.column_names()
            .into_iter()
            .zip(self.kinds.iter())
            .filter(|(_, k)| **k == kind)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Numeric)
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Categorical)
    }

    /// A numeric column as `Float64`, whatever its stored width.
    pub fn numeric_chunked(&self, column: &str) -> Result<Float64Chunked> {
        if self.kind_of(column) != Some(ColumnKind::Numeric) {
            anyhow::bail!("Column '{column}' is not numeric");
        }
        let series = self
            .frame
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series.f64()?.clone())
    }

    /// Values of a numeric column, `None` for missing cells.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.numeric_chunked(column)?.into_iter().collect())
    }

    /// Per-row missing flags for one column.
    pub fn null_mask(&self, column: &str) -> Result<Vec<bool>> {
        let mask = self.frame.column(column)?.as_materialized_series().is_null();
        Ok(mask.into_iter().map(|v| v.unwrap_or(false)).collect())
    }

    /// Cell identities for every row, restricted to `columns`.
    ///
    /// Two rows with equal keys hold the same values; missing equals missing.
    pub fn row_keys(&self, columns: &[String]) -> Result<Vec<Vec<CellKey>>> {
        let mut keys: Vec<Vec<CellKey>> = vec![Vec::with_capacity(columns.len()); self.height()];
        for name in columns {
            let series = self.frame.column(name)?.as_materialized_series();
            match self.kind_of(name) {
                Some(ColumnKind::Numeric) if series.dtype() == &DataType::Int64 => {
                    for (row, value) in keys.iter_mut().zip(series.i64()?.into_iter()) {
                        row.push(value.map_or(CellKey::Missing, CellKey::Integer));
                    }
                }
                Some(ColumnKind::Numeric) => {
                    for (row, value) in keys.iter_mut().zip(series.f64()?.into_iter()) {
                        row.push(value.map_or(CellKey::Missing, CellKey::number));
                    }
                }
                _ => {
                    for (row, value) in keys.iter_mut().zip(series.str()?.into_iter()) {
                        row.push(value.map_or(CellKey::Missing, |s| CellKey::Text(s.to_owned())));
                    }
                }
            }
        }
        Ok(keys)
    }

    /// Copies of the rows at `indices`, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Result<DataFrame> {
        let idx = indices
            .iter()
            .map(|&i| IdxSize::try_from(i).context("Row index exceeds the supported range"))
            .collect::<Result<Vec<IdxSize>>>()?;
        let idx = IdxCa::from_vec("idx".into(), idx);
        self.frame
            .take(&idx)
            .context("Failed to copy flagged rows")
    }
}

/// Hashable identity of a single cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellKey {
    Missing,
    Integer(i64),
    Number(u64),
    Text(String),
}

impl CellKey {
    pub fn number(v: f64) -> Self {
        // -0.0 and 0.0 are the same value
        let v = if v == 0.0 { 0.0 } else { v };
        Self::Number(v.to_bits())
    }
}

/// The seven report sections, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReportSection {
    MissingValues,
    DuplicateRows,
    NegativeValues,
    Outliers,
    InvalidCategories,
    MlAnomalies,
    RuleViolations,
}

impl ReportSection {
    pub const ALL: [Self; 7] = [
        Self::MissingValues,
        Self::DuplicateRows,
        Self::NegativeValues,
        Self::Outliers,
        Self::InvalidCategories,
        Self::MlAnomalies,
        Self::RuleViolations,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingValues => "Missing Values",
            Self::DuplicateRows => "Duplicate Rows",
            Self::NegativeValues => "Negative Values",
            Self::Outliers => "Outliers",
            Self::InvalidCategories => "Invalid Categories",
            Self::MlAnomalies => "ML Anomalies",
            Self::RuleViolations => "JSON Rule Violations",
        }
    }
}

/// What kind of problem a finding reports. Per-column categories carry the
/// column name; the `Display` form is the Issue Counts key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCategory {
    MissingValues,
    DuplicateRows,
    NegativeValues(String),
    Outliers(String),
    InvalidCategories(String),
    MlAnomalies,
    RuleViolations,
}

impl IssueCategory {
    pub fn section(&self) -> ReportSection {
        match self {
            Self::MissingValues => ReportSection::MissingValues,
            Self::DuplicateRows => ReportSection::DuplicateRows,
            Self::NegativeValues(_) => ReportSection::NegativeValues,
            Self::Outliers(_) => ReportSection::Outliers,
            Self::InvalidCategories(_) => ReportSection::InvalidCategories,
            Self::MlAnomalies => ReportSection::MlAnomalies,
            Self::RuleViolations => ReportSection::RuleViolations,
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeValues(col) => write!(f, "Negative Values ({col})"),
            Self::Outliers(col) => write!(f, "Outliers ({col})"),
            Self::InvalidCategories(col) => write!(f, "Invalid Categories ({col})"),
            other => f.write_str(other.section().title()),
        }
    }
}

/// Rows one detector flagged for one condition.
#[derive(Clone, Debug)]
pub struct Finding {
    pub category: IssueCategory,
    pub label: String,
    /// Positions of the flagged rows in the source dataset
    pub row_indices: Vec<usize>,
    /// Copies of the flagged rows, same order as `row_indices`
    pub rows: DataFrame,
}

impl Finding {
    pub fn new(
        dataset: &Dataset,
        category: IssueCategory,
        label: impl Into<String>,
        row_indices: Vec<usize>,
    ) -> Result<Self> {
        let rows = dataset.take_rows(&row_indices)?;
        Ok(Self {
            category,
            label: label.into(),
            row_indices,
            rows,
        })
    }

    /// Builds a finding from a per-row predicate result; `None` when nothing matched.
    pub fn from_mask(
        dataset: &Dataset,
        category: IssueCategory,
        label: impl Into<String>,
        mask: impl IntoIterator<Item = bool>,
    ) -> Result<Option<Self>> {
        let indices: Vec<usize> = mask
            .into_iter()
            .enumerate()
            .filter_map(|(i, hit)| hit.then_some(i))
            .collect();
        if indices.is_empty() {
            return Ok(None);
        }
        Self::new(dataset, category, label, indices).map(Some)
    }

    pub fn len(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_indices.is_empty()
    }
}

/// Every flagged row of a run, grouped by the finding that produced it.
///
/// A source row appears once per condition it trips; rows are never merged
/// across findings.
#[derive(Clone, Debug)]
pub struct FlaggedRows {
    findings: Vec<Finding>,
    /// Empty frame with the dataset's schema, used when nothing was flagged
    template: DataFrame,
}

impl FlaggedRows {
    pub(crate) fn new(findings: Vec<Finding>, template: DataFrame) -> Self {
        Self { findings, template }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Total flagged rows, counting a row once per label.
    pub fn len(&self) -> usize {
        self.findings.iter().map(Finding::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.iter().all(Finding::is_empty)
    }

    /// `(label, source row index)` for every flagged row, in flag order.
    pub fn labeled_indices(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.findings
            .iter()
            .flat_map(|f| f.row_indices.iter().map(move |&i| (f.label.as_str(), i)))
    }

    pub fn in_section(&self, section: ReportSection) -> impl Iterator<Item = &Finding> + '_ {
        self.findings
            .iter()
            .filter(move |f| f.category.section() == section)
    }

    /// All flagged rows stacked into one frame, without labels.
    pub fn to_unlabeled_frame(&self) -> Result<DataFrame> {
        let mut out = self.template.clone();
        for finding in &self.findings {
            out.vstack_mut(&finding.rows)
                .context("Failed to stack flagged rows")?;
        }
        Ok(out)
    }

    /// All flagged rows stacked into one frame with a trailing `issue` label column.
    ///
    /// A dataset column already named `issue` is replaced by the labels.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut out = self.to_unlabeled_frame()?;
        let labels: Vec<&str> = self.labeled_indices().map(|(label, _)| label).collect();
        out.with_column(Series::new(ISSUE_COLUMN.into(), labels))
            .context("Failed to attach issue labels")?;
        Ok(out)
    }

    /// Rows grouped by issue label (first-seen order), at most `limit` per group.
    ///
    /// Each entry is `(label, total rows under the label, preview rows)`.
    pub fn preview_by_label(&self, limit: usize) -> Result<Vec<(String, usize, DataFrame)>> {
        let mut groups: IndexMap<&str, (usize, DataFrame)> = IndexMap::new();
        for finding in &self.findings {
            let (total, preview) = groups
                .entry(finding.label.as_str())
                .or_insert_with(|| (0, self.template.clone()));
            *total += finding.len();
            let room = limit.saturating_sub(preview.height());
            if room > 0 {
                preview
                    .vstack_mut(&finding.rows.head(Some(room)))
                    .context("Failed to build preview")?;
            }
        }
        Ok(groups
            .into_iter()
            .map(|(label, (total, preview))| (label.to_owned(), total, preview))
            .collect())
    }

    /// Distinct source rows flagged by at least one detector.
    pub fn distinct_row_count(&self) -> usize {
        self.labeled_indices()
            .map(|(_, i)| i)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// A detector that failed and was left out of the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDetector {
    pub detector: String,
    pub reason: String,
}

/// Everything one validation run produced.
#[derive(Clone, Debug)]
pub struct ValidationOutcome {
    pub flagged: FlaggedRows,
    pub counts: IssueCounts,
    pub skipped: Vec<SkippedDetector>,
    pub row_count: usize,
    pub column_count: usize,
}

impl ValidationOutcome {
    pub fn has_issues(&self) -> bool {
        !self.counts.is_empty()
    }

    /// Rows in a report section, summed over its findings.
    pub fn section_total(&self, section: ReportSection) -> usize {
        self.flagged.in_section(section).map(Finding::len).sum()
    }
}
