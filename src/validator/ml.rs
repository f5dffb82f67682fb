//! Unsupervised anomaly detection over the numeric columns.
//!
//! Two scorers run on the rows that have every numeric value present:
//!
//! - an isolation forest (random axis-aligned splits; anomalies isolate in
//!   fewer splits), seeded so repeated runs agree;
//! - a local outlier factor (points much sparser than their neighbours).
//!
//! Both flag the `contamination` share of lowest-scoring rows. Their union,
//! deduplicated by numeric values, becomes a single `ML_anomaly` finding.

use super::detectors::Detector;
use super::types::{CellKey, Dataset, Finding, IssueCategory};
use crate::config::AnomalySettings;
use anyhow::{Context as _, Result};
use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use std::collections::HashSet;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Keeps the reachability density finite when neighbours coincide.
const LRD_EPSILON: f64 = 1e-10;

pub struct MlAnomalies<'a> {
    pub settings: &'a AnomalySettings,
}

impl Detector for MlAnomalies<'_> {
    fn name(&self) -> &'static str {
        "ml_anomalies"
    }

    fn detect(&self, dataset: &Dataset) -> Result<Vec<Finding>> {
        let numeric = dataset.numeric_columns();
        if numeric.is_empty() {
            return Ok(Vec::new());
        }

        let complete = complete_rows(dataset, &numeric)?;
        if complete.is_empty() {
            tracing::debug!("No complete numeric rows, skipping anomaly detection");
            return Ok(Vec::new());
        }

        let matrix = dataset
            .take_rows(&complete)?
            .select(numeric.iter().map(String::as_str))?
            .to_ndarray::<Float64Type>(IndexOrder::C)
            .context("Failed to build feature matrix")?;

        let Some(forest) = isolation_forest_outliers(&matrix, self.settings) else {
            tracing::warn!(
                "Isolation forest needs at least 2 complete rows, found {}; skipping anomaly detection",
                matrix.nrows()
            );
            return Ok(Vec::new());
        };
        let Some(lof) = local_outlier_factor_outliers(
            &matrix,
            self.settings.neighbors,
            self.settings.contamination,
        ) else {
            tracing::warn!(
                "Local outlier factor needs more than {} complete rows, found {}; skipping anomaly detection",
                self.settings.neighbors,
                matrix.nrows()
            );
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let flagged: Vec<usize> = forest
            .iter()
            .zip(&lof)
            .enumerate()
            .filter(|(_, (a, b))| **a || **b)
            .filter(|(pos, _)| {
                let key: Vec<CellKey> = matrix.row(*pos).iter().map(|&v| CellKey::number(v)).collect();
                seen.insert(key)
            })
            .filter_map(|(pos, _)| complete.get(pos).copied())
            .collect();

        tracing::debug!(
            "Anomaly scorers flagged {} (forest) and {} (lof) rows, {} after union",
            forest.iter().filter(|f| **f).count(),
            lof.iter().filter(|f| **f).count(),
            flagged.len()
        );

        if flagged.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Finding::new(
            dataset,
            IssueCategory::MlAnomalies,
            "ML_anomaly",
            flagged,
        )?])
    }
}

/// Row positions where every listed column has a value.
fn complete_rows(dataset: &Dataset, columns: &[String]) -> Result<Vec<usize>> {
    let mut complete = vec![true; dataset.height()];
    for column in columns {
        for (keep, missing) in complete.iter_mut().zip(dataset.null_mask(column)?) {
            *keep &= !missing;
        }
    }
    Ok(complete
        .into_iter()
        .enumerate()
        .filter_map(|(i, keep)| keep.then_some(i))
        .collect())
}

/// Value below which `pct` percent of `values` fall, interpolating linearly
/// between the two nearest ranks.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len().checked_sub(1)?;
    let rank = (pct / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (*sorted.get(lo)?, *sorted.get(hi)?);
    Some(a + (b - a) * (rank - lo as f64))
}

/// Flags rows whose score is strictly below the contamination percentile.
fn flag_lowest(scores: &[f64], contamination: f64) -> Vec<bool> {
    match percentile(scores, contamination * 100.0) {
        Some(threshold) => scores.iter().map(|s| *s < threshold).collect(),
        None => vec![false; scores.len()],
    }
}

// ISOLATION FOREST

enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
}

/// Average path length of an unsuccessful search in a binary search tree of `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn grow_tree(
    data: &Array2<f64>,
    rows: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> IsolationNode {
    if depth >= height_limit || rows.len() <= 1 {
        return IsolationNode::Leaf { size: rows.len() };
    }

    // Only features that still vary inside this node can split it
    let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
        .filter_map(|feature| {
            let column = data.column(feature);
            let (lo, hi) = rows
                .iter()
                .filter_map(|&r| column.get(r).copied())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            (hi > lo && (hi - lo).is_finite()).then_some((feature, lo, hi))
        })
        .collect();

    let Some(&(feature, lo, hi)) = candidates.get(rng.random_range(0..candidates.len().max(1)))
    else {
        return IsolationNode::Leaf { size: rows.len() };
    };

    let threshold = rng.random_range(lo..hi);
    let column = data.column(feature);
    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| column.get(r).is_some_and(|v| *v <= threshold));

    IsolationNode::Split {
        feature,
        threshold,
        left: Box::new(grow_tree(data, left, depth + 1, height_limit, rng)),
        right: Box::new(grow_tree(data, right, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &IsolationNode, point: &ArrayView1<'_, f64>, depth: usize) -> f64 {
    match node {
        IsolationNode::Leaf { size } => depth as f64 + average_path_length(*size),
        IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let goes_left = point.get(*feature).is_some_and(|v| *v <= *threshold);
            let next = if goes_left { left } else { right };
            path_length(next, point, depth + 1)
        }
    }
}

/// Anomaly score per row, `-2^(-E[h(x)] / c(ψ))`: lower is more anomalous.
///
/// `None` with fewer than two rows.
pub fn isolation_forest_scores(data: &Array2<f64>, settings: &AnomalySettings) -> Option<Vec<f64>> {
    let n = data.nrows();
    if n < 2 || settings.estimators == 0 {
        return None;
    }

    let sample_size = settings.max_samples.clamp(2, n);
    let height_limit = (sample_size as f64).log2().ceil() as usize;
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let trees: Vec<IsolationNode> = (0..settings.estimators)
        .map(|_| {
            let rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            grow_tree(data, rows, 0, height_limit, &mut rng)
        })
        .collect();

    let normalizer = average_path_length(sample_size);
    let scores = data
        .rows()
        .into_iter()
        .map(|point| {
            let mean_depth = trees
                .iter()
                .map(|tree| path_length(tree, &point, 0))
                .sum::<f64>()
                / trees.len() as f64;
            -(2f64.powf(-mean_depth / normalizer))
        })
        .collect();
    Some(scores)
}

pub fn isolation_forest_outliers(data: &Array2<f64>, settings: &AnomalySettings) -> Option<Vec<bool>> {
    isolation_forest_scores(data, settings).map(|s| flag_lowest(&s, settings.contamination))
}

// LOCAL OUTLIER FACTOR

fn euclidean(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Negated local outlier factor per row: lower is more anomalous.
///
/// `None` unless there are more rows than `k`.
pub fn local_outlier_factor_scores(data: &Array2<f64>, k: usize) -> Option<Vec<f64>> {
    let n = data.nrows();
    if k == 0 || n <= k {
        return None;
    }

    // k nearest neighbours of each row, self excluded, ties broken by row order
    let neighbours: Vec<Vec<(usize, f64)>> = (0..n)
        .map(|i| {
            let point = data.row(i);
            let mut dists: Vec<(usize, f64)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (j, euclidean(&point, &data.row(j))))
                .collect();
            dists.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            dists.truncate(k);
            dists
        })
        .collect();

    let k_distance: Vec<f64> = neighbours
        .iter()
        .map(|nb| nb.last().map_or(0.0, |(_, d)| *d))
        .collect();

    let lrd: Vec<f64> = neighbours
        .iter()
        .map(|nb| {
            let reach_sum: f64 = nb
                .iter()
                .map(|&(j, d)| k_distance.get(j).copied().unwrap_or(0.0).max(d))
                .sum();
            1.0 / (reach_sum / nb.len() as f64 + LRD_EPSILON)
        })
        .collect();

    let scores = neighbours
        .iter()
        .zip(&lrd)
        .map(|(nb, own)| {
            let neighbour_lrd: f64 = nb
                .iter()
                .map(|&(j, _)| lrd.get(j).copied().unwrap_or(0.0))
                .sum::<f64>()
                / nb.len() as f64;
            -(neighbour_lrd / own)
        })
        .collect();
    Some(scores)
}

pub fn local_outlier_factor_outliers(
    data: &Array2<f64>,
    k: usize,
    contamination: f64,
) -> Option<Vec<bool>> {
    local_outlier_factor_scores(data, k).map(|s| flag_lowest(&s, contamination))
}
