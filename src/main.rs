//! # tabcheck command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Initialize logging (console + rolling files)
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   │
//!   └─> Run the subcommand (validate / profile)
//! ```
//!
//! ```bash
//! tabcheck validate --file data/sales.csv --rules data/validation_rules.json
//! tabcheck profile --file data/sales.csv --json
//! ```

#![expect(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    // Runs without logs when the data directory is unavailable
    if let Err(e) = tabcheck::logging::init() {
        eprintln!("Logging disabled: {e:#}");
    }

    let cli = cli::Cli::parse();
    cli::run_command(cli.command)
}
