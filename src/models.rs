//! Data models for the statistics pipeline.
//!
//! This module contains the records parsed from the dataset, the
//! summaries derived from them, and the report structures rendered
//! at the end of a run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the raw dataset: a single country on a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Reporting date.
    pub date: NaiveDate,
    /// Country or territory name, as published by the provider.
    pub country: String,
    /// ISO alpha-3 code. Blank for rows that are not a territory.
    pub country_code: Option<String>,
    /// New cases reported that day. Negative values are provider corrections.
    pub cases: i64,
    /// New deaths reported that day.
    pub deaths: i64,
    /// Population figure used for normalization.
    pub population: Option<u64>,
}

/// Summary statistics for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryAggregate {
    /// Country name.
    pub country: String,
    /// Geographic code taken from the first record of the country.
    pub geo_id: Option<String>,
    /// Sum of daily cases.
    pub total_cases: i64,
    /// Sum of daily deaths.
    pub total_deaths: i64,
    /// `total_deaths / total_cases`, rounded to 4 decimal places.
    pub death_rate: f64,
    /// First population figure recorded for the country.
    pub population: Option<u64>,
}

impl CountryAggregate {
    /// Returns the death rate as a percentage.
    pub fn death_rate_percent(&self) -> f64 {
        self.death_rate * 100.0
    }

    /// Returns total cases per million inhabitants, if a population is known.
    pub fn cases_per_million(&self) -> Option<f64> {
        match self.population {
            Some(population) if population > 0 => {
                Some(self.total_cases as f64 / population as f64 * 1_000_000.0)
            }
            _ => None,
        }
    }
}

/// A single day of a country's series, ready for charting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub cases: i64,
    pub deaths: i64,
}

/// A single day of a country's series normalized by population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerMillionPoint {
    pub date: NaiveDate,
    pub cases_per_million: f64,
    pub deaths_per_million: f64,
}

/// One slice of a multi-country comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryComparison {
    pub country: String,
    pub total_cases: i64,
    /// Total cases per million inhabitants, truncated.
    pub cases_per_million: i64,
    /// Fraction of the compared countries' combined cases.
    pub share: f64,
}

/// Value plotted on a world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MapMetric {
    /// Total deaths per country (default)
    #[default]
    TotalDeaths,
    /// Case mortality rate as a percentage
    DeathRate,
}

impl fmt::Display for MapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapMetric::TotalDeaths => write!(f, "Total Deaths"),
            MapMetric::DeathRate => write!(f, "Case Mortality Rate (%)"),
        }
    }
}

/// A country placed on a choropleth map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoroplethPoint {
    pub geo_id: String,
    pub country: String,
    pub value: f64,
    /// Hover text.
    pub label: String,
}

/// Outcome of the dataset download step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchStatus {
    /// A fresh copy was written.
    Fetched { bytes: u64 },
    /// Download was not attempted.
    Skipped,
    /// Download failed; the file on disk (if any) was used instead.
    Failed { reason: String },
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Fetched { bytes } => write!(f, "fetched ({} bytes)", bytes),
            FetchStatus::Skipped => write!(f, "skipped"),
            FetchStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Local dataset file the report was computed from.
    pub dataset_path: String,
    /// Where the dataset was fetched from.
    pub source: String,
    /// Result of the download step.
    pub fetch_status: FetchStatus,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of rows loaded.
    pub records_loaded: usize,
    /// Number of distinct countries in the dataset.
    pub countries: usize,
}

/// The data shown by a report, one variant per view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum ReportBody {
    /// Every country's totals.
    World { aggregates: Vec<CountryAggregate> },
    /// One country's totals and chronological series.
    Country {
        aggregate: CountryAggregate,
        timeline: Vec<DailyPoint>,
        #[serde(skip_serializing_if = "Option::is_none")]
        per_million: Option<Vec<PerMillionPoint>>,
    },
    /// Population-normalized comparison of several countries.
    Comparison { rows: Vec<CountryComparison> },
    /// Choropleth series.
    Map {
        metric: MapMetric,
        points: Vec<ChoroplethPoint>,
    },
}

/// A complete report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub body: ReportBody,
}
