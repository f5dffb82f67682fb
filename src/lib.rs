//! # tabcheck - data quality checks for tabular files
//!
//! tabcheck reads a CSV file, runs a fixed set of quality checks over it and
//! reports the rows that failed each one:
//!
//! - missing cells and exact duplicate rows
//! - negative values and three-sigma outliers in numeric columns
//! - missing categories in text columns
//! - unsupervised anomalies (isolation forest and local outlier factor)
//! - optional per-column rules loaded from a JSON file
//!
//! ## Quick Start
//!
//! ```no_run
//! use tabcheck::config::ValidationSettings;
//! use tabcheck::validator::validate_dataset;
//! use std::path::Path;
//!
//! # fn main() -> tabcheck::error::Result<()> {
//! let settings = ValidationSettings::default().with_env_overrides();
//! let run = validate_dataset(
//!     Path::new("data/sales.csv"),
//!     Some(Path::new("data/validation_rules.json")),
//!     &settings,
//! )?;
//! println!("{} rows flagged", run.outcome.flagged.distinct_row_count());
//! println!("report: {}", run.report_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`validator`]: dataset loading, detectors, aggregation and the HTML report
//! - [`config`]: validation settings and their file/environment sources
//! - [`error`]: error types and handling utilities
//! - [`logging`]: console and rolling-file logging for the binary
//! - [`utils`]: formatting and atomic file writes
//!
//! ## Key Concepts
//!
//! ### Normalized datasets
//!
//! Every column is read as text. Missing markers (`""`, `NA`, `N/A`, `-`)
//! become nulls, and a column whose remaining cells all parse as numbers is
//! treated as numeric. All checks see the same normalized data.
//!
//! ### Findings, not mutations
//!
//! Detectors never change the dataset. Each returns copies of the rows it
//! flagged, tagged with an issue label such as `price_below_min`; a row that
//! trips several checks appears once per check.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod validator;
