use super::types::{ColumnKind, Dataset, FlaggedRows};
use crate::config::ValidationSettings;
use crate::error::{Result, ResultExt as _, TabcheckError};
use polars::prelude::*;
use std::path::Path;

/// Reads a CSV file into a normalized [`Dataset`].
///
/// Every column is read as text first so that missing markers are removed
/// before column kinds are decided.
///
/// # Errors
///
/// Fails when the file is absent, is not a CSV, or cannot be parsed.
pub fn load_dataset(path: &Path, settings: &ValidationSettings) -> Result<Dataset> {
    if !path.is_file() {
        return Err(TabcheckError::InvalidPath(format!(
            "Dataset not found: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext != "csv" {
        return Err(TabcheckError::InvalidPath(format!(
            "Unsupported file extension: {ext}"
        )));
    }

    let raw = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .and_then(LazyFrame::collect)
        .context("Failed to read CSV")?;

    tracing::debug!(
        "Read {} rows x {} columns from {}",
        raw.height(),
        raw.width(),
        path.display()
    );

    normalize_frame(raw, settings)
}

/// Turns missing markers into nulls and infers each column's kind.
///
/// A column is numeric when every remaining cell parses as a number; a column
/// with no remaining cells at all counts as numeric too. Whole-number columns
/// stay `Int64` so that large identifiers keep every digit.
pub fn normalize_frame(raw: DataFrame, settings: &ValidationSettings) -> Result<Dataset> {
    let mut columns = Vec::with_capacity(raw.width());
    let mut kinds = Vec::with_capacity(raw.width());

    for column in raw.get_columns() {
        let text = column
            .as_materialized_series()
            .cast(&DataType::String)
            .with_context(|| format!("Column '{}' cannot be read as text", column.name()))?;
        let cells: Vec<Option<&str>> = text
            .str()?
            .into_iter()
            .map(|cell| cell.filter(|s| !settings.is_missing_marker(s)))
            .collect();

        let name = column.name().clone();
        let (series, kind) = if let Some(values) = parse_all(&cells, parse_integer) {
            (Series::new(name, values), ColumnKind::Numeric)
        } else if let Some(values) = parse_all(&cells, parse_number) {
            (Series::new(name, values), ColumnKind::Numeric)
        } else {
            (Series::new(name, cells), ColumnKind::Categorical)
        };
        columns.push(Column::from(series));
        kinds.push(kind);
    }

    let frame = DataFrame::new(columns)?;
    Ok(Dataset::from_parts(frame, kinds))
}

impl Dataset {
    /// Normalizes an in-memory frame the same way [`load_dataset`] normalizes a file.
    ///
    /// # Errors
    ///
    /// Fails if a column cannot be represented as text.
    pub fn from_frame(frame: DataFrame, settings: &ValidationSettings) -> Result<Self> {
        normalize_frame(frame, settings)
    }
}

/// `Some` only when every present cell parses.
fn parse_all<T>(cells: &[Option<&str>], parse: fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => parse(s).map(Some),
        })
        .collect()
}

fn parse_integer(cell: &str) -> Option<i64> {
    cell.trim().parse::<i64>().ok()
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Writes flagged rows as CSV, without the issue label column.
///
/// The file is rendered in memory and replaced in one step.
pub fn write_flagged_csv(flagged: &FlaggedRows, path: &Path) -> Result<()> {
    let mut df = flagged.to_unlabeled_frame()?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)
        .context("Failed to render issues CSV")?;
    crate::utils::write_atomic(path, &buffer)
        .with_context(|| format!("Failed to write {}", path.display()))
}
