//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::ComparisonSource;
use clap::Parser;
use std::path::PathBuf;

/// tractstat - aggregate DSI Studio tract statistics
///
/// Reads per-subject whole-brain and per-structure stat files, combines
/// lateralized structures into tract groups with streamline-weighted FA,
/// and writes per-tract summary and comparison tables.
///
/// Examples:
///   tractstat
///   tractstat --results-dir /data/results --output-dir ./tables
///   tractstat --comparison structures --format markdown
///   tractstat --dry-run
///   tractstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the tractography results
    ///
    /// Overrides `general.results_dir` from the config file.
    #[arg(short, long, value_name = "DIR", env = "TRACTSTAT_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Directory the output tables are written to
    ///
    /// Defaults to the results directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tractstat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Additional report written next to the CSV tables
    #[arg(long, default_value = "csv", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Source of the FA comparison table (groups, structures)
    #[arg(long, value_name = "SOURCE")]
    pub comparison: Option<ComparisonSource>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the stat files the run would read and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tractstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// CSV tables only (default)
    #[default]
    Csv,
    /// CSV tables plus a JSON report
    Json,
    /// CSV tables plus a Markdown report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref results_dir) = self.results_dir {
            if !results_dir.exists() {
                return Err(format!(
                    "Results directory does not exist: {}",
                    results_dir.display()
                ));
            }
            if !results_dir.is_dir() {
                return Err(format!(
                    "Results path is not a directory: {}",
                    results_dir.display()
                ));
            }
        }

        if let Some(ref output_dir) = self.output_dir {
            if output_dir.is_file() {
                return Err(format!(
                    "Output path is a file: {}",
                    output_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
