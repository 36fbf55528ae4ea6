//! Command-line interface definitions for Research Radar.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options that make sense in automation can also be provided via
//! environment variables.

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for the Research Radar pipeline.
///
/// Runtime behavior lives in the YAML config; the CLI covers run-specific
/// choices (which date, which topics) and the config's location.
///
/// # Examples
///
/// ```sh
/// # Run for today with the configured topics
/// research_radar --config config.yaml
///
/// # Re-run a past date with a one-off topic list
/// research_radar -c config.yaml -d 2025-05-06 -t "gene therapy,mRNA vaccines"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml", env = "RESEARCH_RADAR_CONFIG")]
    pub config: String,

    /// Target date for discovery (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Comma-separated topics overriding the configured list
    #[arg(short, long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// Output directory override for ranked candidate lists
    #[arg(short, long, env = "RESEARCH_RADAR_OUTPUT_DIR")]
    pub output_dir: Option<String>,
}
