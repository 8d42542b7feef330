//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::MapMetric;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// epistats - COVID-19 case and death statistics per country
///
/// Downloads the ECDC case-distribution dataset and reports totals,
/// case mortality rates, chronological series, and comparisons.
///
/// Examples:
///   epistats
///   epistats --view country --country Germany
///   epistats --view compare --countries Germany,France,Poland --format json
///   epistats --view map --metric death-rate --output map.json --format json
///   epistats --skip-fetch --list-countries
///   epistats --export normalized.csv
///   epistats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// What to report on
    #[arg(long, default_value = "world", value_name = "VIEW")]
    pub view: View,

    /// Country to report on (exact name as published, e.g. United_Kingdom)
    ///
    /// Required with --view country.
    #[arg(short = 'C', long, value_name = "NAME")]
    pub country: Option<String>,

    /// Countries to compare (comma-separated)
    ///
    /// Defaults to the [comparison] list in .epistats.toml.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub countries: Option<Vec<String>>,

    /// Value plotted on the world map
    #[arg(long, default_value = "total-deaths", value_name = "METRIC")]
    pub metric: MapMetric,

    /// Local dataset file
    #[arg(short, long, value_name = "FILE", env = "EPISTATS_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Dataset source URL or path
    #[arg(short, long, value_name = "URL", env = "EPISTATS_SOURCE")]
    pub source: Option<String>,

    /// Use the existing dataset file without downloading
    #[arg(long)]
    pub skip_fetch: bool,

    /// Output file path for the report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Show only the N countries with the most deaths in the world view
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .epistats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Write the loaded dataset to FILE in the canonical column layout
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// List the countries in the dataset and exit
    #[arg(long)]
    pub list_countries: bool,

    /// Generate a default .epistats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Report view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum View {
    /// Totals for every country (default)
    #[default]
    World,
    /// One country's totals and daily series
    Country,
    /// Population-normalized comparison of several countries
    Compare,
    /// Choropleth series for a world map
    Map,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
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

        if self.view == View::Country && !self.list_countries {
            match self.country.as_deref() {
                None => return Err("--view country requires --country <NAME>".to_string()),
                Some(name) if name.trim().is_empty() => {
                    return Err("Country name must not be empty".to_string())
                }
                _ => {}
            }
        }

        if let Some(ref countries) = self.countries {
            if countries.iter().any(|c| c.trim().is_empty()) {
                return Err("Country list must not contain empty names".to_string());
            }
        }

        if let Some(ref source) = self.source {
            if source.trim().is_empty() {
                return Err("Source must not be empty".to_string());
            }
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.skip_fetch {
            if let Some(ref dataset) = self.dataset {
                if !dataset.is_file() {
                    return Err(format!(
                        "Dataset file does not exist: {}",
                        dataset.display()
                    ));
                }
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
