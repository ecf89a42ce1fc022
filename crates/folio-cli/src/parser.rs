//! Command-line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Run preloader scenarios against the simulated page.
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Replay page-load scenarios through the folio preloader")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario through the preloader and print its report
    Simulate(SimulateArgs),

    /// List the built-in scenarios
    Scenarios,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SimulateArgs {
    /// Path to a JSON scenario file
    #[arg(conflicts_with = "builtin", required_unless_present = "builtin")]
    pub file: Option<PathBuf>,

    /// Name of a built-in scenario (see `folio scenarios`)
    #[arg(long)]
    pub builtin: Option<String>,

    /// Run on a paused clock: timers fire instantly, timings stay exact
    #[arg(long)]
    pub virtual_clock: bool,

    /// Seed for progress bar increments
    #[arg(long, env = "FOLIO_SEED")]
    pub seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
