use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabcheck::config::{DEFAULT_RULES_PATH, ValidationSettings, load_settings};
use tabcheck::validator::{
    ValidationOutcome, load_dataset, profile_dataset, validate_dataset, write_flagged_csv,
};

#[derive(Parser)]
#[command(name = "tabcheck", about = "Data quality checks for CSV files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every check on a CSV file and write an HTML report
    Validate {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// JSON rule file. Defaults to data/validation_rules.json when present.
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Directory for the HTML report (overrides config and environment)
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Where to write the flagged rows as CSV. Defaults to <report dir>/<stem>_issues.csv.
        #[arg(long)]
        issues_csv: Option<PathBuf>,

        /// Path to a JSON settings file
        #[arg(long, env = "TABCHECK_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print a per-column profile of a CSV file
    Profile {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Print the profile as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Path to a JSON settings file
        #[arg(long, env = "TABCHECK_CONFIG")]
        config: Option<PathBuf>,
    },
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Validate {
            file,
            rules,
            report_dir,
            issues_csv,
            config,
        } => handle_validate(&file, rules, report_dir, issues_csv, config.as_deref()),
        Commands::Profile { file, json, config } => handle_profile(&file, json, config.as_deref()),
    }
}

fn settings_from(config: Option<&Path>) -> Result<ValidationSettings> {
    load_settings(config).context("Failed to load settings")
}

fn handle_validate(
    file: &Path,
    rules: Option<PathBuf>,
    report_dir: Option<PathBuf>,
    issues_csv: Option<PathBuf>,
    config: Option<&Path>,
) -> Result<()> {
    let mut settings = settings_from(config)?;
    if let Some(dir) = report_dir {
        settings.report_dir = dir;
    }
    let rules = rules.unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH));

    println!("Validating {}...", file.display());
    let run = validate_dataset(file, Some(&rules), &settings)?;
    let outcome = &run.outcome;

    print_summary(outcome);
    print_preview(outcome, settings.preview_row_limit)?;

    if !outcome.flagged.is_empty() {
        let csv_path = match issues_csv {
            Some(p) => p,
            None => default_issues_path(file, &settings.report_dir),
        };
        write_flagged_csv(&outcome.flagged, &csv_path)?;
        println!("Flagged rows saved to: {}", csv_path.display());
    }

    println!("Report saved to: {}", run.report_path.display());
    Ok(())
}

fn print_summary(outcome: &ValidationOutcome) {
    println!(
        "\n{} rows, {} columns, {} flagged rows",
        outcome.row_count,
        outcome.column_count,
        outcome.flagged.distinct_row_count()
    );

    if outcome.has_issues() {
        for (category, count) in &outcome.counts {
            println!("  {category:<32} {count:>8}");
        }
    } else {
        println!("No issues found!");
    }

    for skipped in &outcome.skipped {
        println!("  (skipped {}: {})", skipped.detector, skipped.reason);
    }
}

fn print_preview(outcome: &ValidationOutcome, limit: usize) -> Result<()> {
    for (label, total, rows) in outcome.flagged.preview_by_label(limit)? {
        println!("\n{label} ({total} rows)");
        println!("{rows}");
    }
    Ok(())
}

fn default_issues_path(file: &Path, report_dir: &Path) -> PathBuf {
    let stem = file.file_stem().unwrap_or_default().to_string_lossy();
    report_dir.join(format!("{stem}_issues.csv"))
}

fn handle_profile(file: &Path, json: bool, config: Option<&Path>) -> Result<()> {
    let settings = settings_from(config)?;
    let dataset = load_dataset(file, &settings)?;
    let profile = profile_dataset(&dataset)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!(
        "{}: {} rows, {} columns, {} duplicate rows\n",
        file.display(),
        profile.rows,
        profile.columns,
        profile.duplicate_rows
    );
    println!(
        "{:<24} {:<12} {:>8} {:>8} {:>8} {:>12} {:>12} {:>12} {:>12}",
        "column", "kind", "missing", "distinct", "negative", "mean", "std", "min", "max"
    );
    for col in &profile.column_profiles {
        println!(
            "{:<24} {:<12} {:>8} {:>8} {:>8} {:>12} {:>12} {:>12} {:>12}",
            col.name,
            col.kind.as_str(),
            col.missing,
            col.distinct,
            col.negatives.map_or_else(|| "-".to_owned(), |n| n.to_string()),
            tabcheck::utils::fmt_opt(col.mean),
            tabcheck::utils::fmt_opt(col.std),
            tabcheck::utils::fmt_opt(col.min),
            tabcheck::utils::fmt_opt(col.max),
        );
    }
    Ok(())
}
