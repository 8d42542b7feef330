//! Dataset file loading and saving.
//!
//! The provider's CSV layout has changed between revisions, so columns are
//! located by header name rather than position. Every call re-reads the file;
//! nothing is cached.

use crate::models::CaseRecord;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const DATE_COLUMNS: &[&str] = &["dateRep", "date"];
const COUNTRY_COLUMNS: &[&str] = &["countriesAndTerritories", "country"];
const CASES_COLUMNS: &[&str] = &["cases"];
const DEATHS_COLUMNS: &[&str] = &["deaths"];
const CODE_COLUMNS: &[&str] = &["countryterritoryCode", "countryCode"];

/// Accepted date layouts: the provider's day-first form, then ISO.
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

/// Errors raised while reading or writing a dataset file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open dataset {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset {} is missing required column `{column}`", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}:{line}: invalid {field} `{value}`", .path.display())]
    InvalidField {
        path: PathBuf,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("failed to read dataset {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write dataset {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to flush dataset {}: {source}", .path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    country: usize,
    cases: usize,
    deaths: usize,
    code: Option<usize>,
    population: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self, StoreError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}'))
            .collect();

        let require = |aliases: &'static [&'static str]| {
            position(&names, aliases).ok_or_else(|| StoreError::MissingColumn {
                path: path.to_path_buf(),
                column: aliases[0],
            })
        };

        Ok(Self {
            date: require(DATE_COLUMNS)?,
            country: require(COUNTRY_COLUMNS)?,
            cases: require(CASES_COLUMNS)?,
            deaths: require(DEATHS_COLUMNS)?,
            code: position(&names, CODE_COLUMNS),
            // The provider suffixes the census year, e.g. popData2019.
            population: names
                .iter()
                .position(|name| name.starts_with("popData") || *name == "population"),
        })
    }
}

fn position(names: &[&str], aliases: &[&str]) -> Option<usize> {
    names
        .iter()
        .position(|name| aliases.iter().any(|alias| alias == name))
}

/// Load every record from the dataset at `path`, in file order.
pub fn load(path: &Path) -> Result<Vec<CaseRecord>, StoreError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let columns = Columns::resolve(&headers, path)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        records.push(parse_row(&row, &columns, path, line)?);
    }

    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn parse_row(
    row: &StringRecord,
    columns: &Columns,
    path: &Path,
    line: u64,
) -> Result<CaseRecord, StoreError> {
    let cell = |index: usize| row.get(index).unwrap_or("");
    let optional = |index: Option<usize>| index.map(cell).filter(|value| !value.is_empty());
    let invalid = |field: &'static str, value: &str| StoreError::InvalidField {
        path: path.to_path_buf(),
        line,
        field,
        value: value.to_string(),
    };

    let date_text = cell(columns.date);
    let date = parse_date(date_text).ok_or_else(|| invalid("date", date_text))?;

    let country = cell(columns.country);
    if country.is_empty() {
        return Err(invalid("country", country));
    }

    let cases_text = cell(columns.cases);
    let cases = cases_text
        .parse::<i64>()
        .map_err(|_| invalid("cases", cases_text))?;

    let deaths_text = cell(columns.deaths);
    let deaths = deaths_text
        .parse::<i64>()
        .map_err(|_| invalid("deaths", deaths_text))?;

    let population = match optional(columns.population) {
        Some(text) => Some(
            text.parse::<u64>()
                .map_err(|_| invalid("population", text))?,
        ),
        None => None,
    };

    Ok(CaseRecord {
        date,
        country: country.to_string(),
        country_code: optional(columns.code).map(String::from),
        cases,
        deaths,
        population,
    })
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Write `records` to `path` in the canonical column layout, replacing any existing file.
pub fn save(path: &Path, records: &[CaseRecord]) -> Result<(), StoreError> {
    let write_err = |source: csv::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new().from_path(path).map_err(write_err)?;
    writer
        .write_record([
            "dateRep",
            "countriesAndTerritories",
            "cases",
            "deaths",
            "countryterritoryCode",
            "popData",
        ])
        .map_err(write_err)?;

    for record in records {
        writer
            .write_record([
                record.date.format("%Y-%m-%d").to_string(),
                record.country.clone(),
                record.cases.to_string(),
                record.deaths.to_string(),
                record.country_code.clone().unwrap_or_default(),
                record.population.map(|p| p.to_string()).unwrap_or_default(),
            ])
            .map_err(write_err)?;
    }

    writer.flush().map_err(|source| StoreError::Flush {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}
