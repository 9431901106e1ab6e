use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Path to the project config YAML
    #[arg(short, long, default_value = "config.yaml", global = true)]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create the project folder layout and breakup dates file
    Setup,
    /// Download USGS series and write processed CSVs with metadata
    Download,
    /// Split processed series into winter seasons
    Winters,
    /// Extract breakup events around the listed dates
    Events,
    /// Aggregate daily and monthly statistics
    Stats,
    /// Render statistics and winter plots
    Plot,
    /// Run every stage in order
    RunAll,
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Name used for the stage's log file.
    pub fn stage_name(&self) -> &'static str {
        match self {
            Commands::Setup => "setup",
            Commands::Download => "download",
            Commands::Winters => "winters",
            Commands::Events => "events",
            Commands::Stats => "stats",
            Commands::Plot => "plot",
            Commands::RunAll => "run-all",
            Commands::Completions { .. } => "completions",
        }
    }
}
