//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.epistats.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".epistats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dataset location settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Country comparison settings.
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

/// Where the dataset comes from and where it is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Remote endpoint or local path to fetch from.
    #[serde(default = "default_source")]
    pub source: String,

    /// Local file the dataset is saved to and loaded from.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            path: default_path(),
        }
    }
}

fn default_source() -> String {
    "https://opendata.ecdc.europa.eu/covid19/casedistribution/csv".to_string()
}

fn default_path() -> String {
    "covid_19_latest.csv".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Limit the world view to the N countries with the most deaths.
    #[serde(default)]
    pub top: Option<usize>,
}

/// Countries shown by the comparison view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default = "default_comparison_countries")]
    pub countries: Vec<String>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            countries: default_comparison_countries(),
        }
    }
}

/// Germany and its neighbours, as published by the provider.
fn default_comparison_countries() -> Vec<String> {
    vec![
        "Germany",
        "France",
        "Netherlands",
        "Switzerland",
        "Czechia",
        "Denmark",
        "Poland",
        "Luxembourg",
        "Belgium",
        "Italy",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dataset) = args.dataset {
            self.dataset.path = dataset.to_string_lossy().to_string();
        }
        if let Some(ref source) = args.source {
            self.dataset.source = source.clone();
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top) = args.top {
            self.report.top = Some(top);
        }

        if let Some(ref countries) = args.countries {
            self.comparison.countries = countries.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset.path, "covid_19_latest.csv");
        assert!(config.dataset.source.starts_with("https://opendata.ecdc.europa.eu"));
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert_eq!(config.comparison.countries.len(), 10);
        assert_eq!(config.comparison.countries[0], "Germany");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[dataset]
source = "https://example.org/cases.csv"
path = "data/cases.csv"

[report]
format = "json"
top = 20

[comparison]
countries = ["Spain", "Portugal"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.dataset.source, "https://example.org/cases.csv");
        assert_eq!(config.dataset.path, "data/cases.csv");
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.top, Some(20));
        assert_eq!(config.comparison.countries, vec!["Spain", "Portugal"]);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[report]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.dataset.path, "covid_19_latest.csv");
        assert_eq!(config.comparison.countries.len(), 10);
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config: Config = toml::from_str("[report]\nformat = \"json\"\ntop = 5\n").unwrap();
        let args = Args::try_parse_from(["epistats", "--dataset", "other.csv"]).unwrap();

        config.merge_with_args(&args);

        assert_eq!(config.dataset.path, "other.csv");
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.top, Some(5));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[dataset]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[comparison]"));
    }
}
