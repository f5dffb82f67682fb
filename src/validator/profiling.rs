//! Column-level profiling of a normalized dataset.
//!
//! A profile is the quick look a user takes before deciding on rules: how
//! many cells are missing, how varied each column is, and the basic
//! distribution of the numeric ones. It shares the dataset model with the
//! detectors, so "missing" and "numeric" mean the same thing in both.

use super::detectors::{Detector as _, DuplicateRows};
use super::types::{ColumnKind, Dataset};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub missing: usize,
    pub distinct: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub negatives: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: usize,
    /// Rows that repeat an earlier row exactly
    pub duplicate_rows: usize,
    pub column_profiles: Vec<ColumnProfile>,
}

pub fn profile_dataset(dataset: &Dataset) -> Result<DatasetProfile> {
    let column_profiles = dataset
        .column_names()
        .into_iter()
        .map(|name| profile_column(dataset, name))
        .collect::<Result<Vec<_>>>()?;

    let duplicate_rows = DuplicateRows
        .detect(dataset)?
        .iter()
        .map(|f| f.len())
        .sum();

    Ok(DatasetProfile {
        rows: dataset.height(),
        columns: dataset.width(),
        duplicate_rows,
        column_profiles,
    })
}

fn profile_column(dataset: &Dataset, name: String) -> Result<ColumnProfile> {
    let series = dataset.frame().column(&name)?.as_materialized_series();
    let missing = series.null_count();
    let non_null = series.len() - missing;
    let distinct = series.drop_nulls().n_unique()?;
    let kind = dataset.kind_of(&name).unwrap_or(ColumnKind::Categorical);

    let mut profile = ColumnProfile {
        name,
        kind,
        non_null,
        missing,
        distinct,
        mean: None,
        std: None,
        min: None,
        max: None,
        negatives: None,
    };

    if kind == ColumnKind::Numeric {
        let ca = dataset.numeric_chunked(&profile.name)?;
        profile.min = ca.min();
        profile.max = ca.max();
        profile.mean = ca.mean();
        profile.std = ca.std(1).filter(|v| v.is_finite());
        profile.negatives = Some(ca.into_iter().flatten().filter(|&v| v < 0.0).count());
    }

    Ok(profile)
}
