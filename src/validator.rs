//! Data validation engine.
//!
//! Loads a CSV into a normalized [`Dataset`], runs every detector over it,
//! merges the findings into flagged rows plus ordered issue counts, and
//! renders an HTML report.
//!
//! ```no_run
//! use tabcheck::config::ValidationSettings;
//! use tabcheck::validator::validate_dataset;
//! use std::path::Path;
//!
//! # fn main() -> tabcheck::error::Result<()> {
//! let settings = ValidationSettings::default();
//! let run = validate_dataset(Path::new("sales.csv"), None, &settings)?;
//! for (category, count) in &run.outcome.counts {
//!     println!("{category}: {count}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod detectors;
pub mod flows;
pub mod io;
pub mod ml;
pub mod profiling;
pub mod report;
pub mod rules;
pub mod types;

pub use aggregate::aggregate;
pub use detectors::{Detector, standard_set};
pub use flows::{ValidationRun, report_path_for, validate_dataset, validate_frame};
pub use io::{load_dataset, write_flagged_csv};
pub use profiling::{ColumnProfile, DatasetProfile, profile_dataset};
pub use report::render_html;
pub use rules::{ColumnRule, RuleSet, load_rules};
pub use types::{
    ColumnKind, Dataset, Finding, FlaggedRows, IssueCategory, IssueCounts, ReportSection,
    SkippedDetector, ValidationOutcome,
};
