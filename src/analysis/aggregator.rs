//! Per-country aggregation and statistics.
//!
//! This module reduces a country's daily records into totals and a
//! case mortality rate, and compares countries by population.

use crate::analysis::filter::{filter_by_country, group_by_country};
use crate::models::{CaseRecord, CountryAggregate, CountryComparison};
use std::borrow::Borrow;
use thiserror::Error;

/// Decimal places kept in a death rate.
const RATE_PLACES: i32 = 4;

/// Errors raised when a statistic cannot be derived from the records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The input contained no records at all.
    #[error("no records to aggregate")]
    NoRecords,

    /// The country exists but its cases sum to zero, so the rate is undefined.
    #[error("no cases recorded for {country}; death rate is undefined")]
    NoCases { country: String },

    /// The requested country does not appear in the dataset.
    #[error("no records found for country `{country}`")]
    UnknownCountry { country: String },

    /// Population-normalized figures need a non-zero population.
    #[error("no population figure recorded for {country}")]
    MissingPopulation { country: String },
}

impl AggregateError {
    /// The country the error is about, if any.
    pub fn country(&self) -> Option<&str> {
        match self {
            AggregateError::NoRecords => None,
            AggregateError::NoCases { country }
            | AggregateError::UnknownCountry { country }
            | AggregateError::MissingPopulation { country } => Some(country),
        }
    }
}

/// Round half away from zero to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// First non-zero population among the records.
pub(crate) fn population_of<R: Borrow<CaseRecord>>(records: &[R]) -> Option<u64> {
    records
        .iter()
        .find_map(|r| r.borrow().population.filter(|p| *p > 0))
}

/// Reduce one country's records into a [`CountryAggregate`].
///
/// The geographic code is taken from the first record even when later
/// records disagree. Fails with [`AggregateError::NoRecords`] on empty input
/// and [`AggregateError::NoCases`] when cases sum to zero.
pub fn aggregate<R: Borrow<CaseRecord>>(records: &[R]) -> Result<CountryAggregate, AggregateError> {
    let first: &CaseRecord = records.first().ok_or(AggregateError::NoRecords)?.borrow();

    let total_cases: i64 = records.iter().map(|r| r.borrow().cases).sum();
    let total_deaths: i64 = records.iter().map(|r| r.borrow().deaths).sum();

    if total_cases == 0 {
        return Err(AggregateError::NoCases {
            country: first.country.clone(),
        });
    }

    Ok(CountryAggregate {
        country: first.country.clone(),
        geo_id: first.country_code.clone(),
        total_cases,
        total_deaths,
        death_rate: round_to(total_deaths as f64 / total_cases as f64, RATE_PLACES),
        population: population_of(records),
    })
}

/// Aggregate every country in the table, in first-seen order.
///
/// The first country that cannot be aggregated aborts the whole run.
pub fn aggregate_all(table: &[CaseRecord]) -> Result<Vec<CountryAggregate>, AggregateError> {
    group_by_country(table)
        .into_iter()
        .map(|(_, records)| aggregate(&records))
        .collect()
}

/// Compare total cases across `countries`, in the order given.
pub fn compare(
    table: &[CaseRecord],
    countries: &[String],
) -> Result<Vec<CountryComparison>, AggregateError> {
    let mut rows = Vec::with_capacity(countries.len());

    for country in countries {
        let records = filter_by_country(table, country);
        if records.is_empty() {
            return Err(AggregateError::UnknownCountry {
                country: country.clone(),
            });
        }

        let population = population_of(&records).ok_or_else(|| AggregateError::MissingPopulation {
            country: country.clone(),
        })?;
        let total_cases: i64 = records.iter().map(|r| r.cases).sum();

        rows.push(CountryComparison {
            country: country.clone(),
            total_cases,
            cases_per_million: (total_cases as f64 / population as f64 * 1_000_000.0) as i64,
            share: 0.0,
        });
    }

    // Shares stay at zero when the compared countries have no cases between them.
    let grand_total: i64 = rows.iter().map(|r| r.total_cases).sum();
    if grand_total != 0 {
        for row in &mut rows {
            row.share = row.total_cases as f64 / grand_total as f64;
        }
    }

    Ok(rows)
}

/// Sort aggregates by total deaths (highest first).
pub fn sort_by_deaths(aggregates: &mut [CountryAggregate]) {
    aggregates.sort_by_key(|a| std::cmp::Reverse(a.total_deaths));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;
    use chrono::NaiveDate;
    use std::path::Path;

    fn record(country: &str, code: &str, day: u32, cases: i64, deaths: i64) -> CaseRecord {
        CaseRecord {
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            country: country.to_string(),
            country_code: Some(code.to_string()),
            cases,
            deaths,
            population: None,
        }
    }

    fn fixture(name: &str) -> Vec<CaseRecord> {
        store::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)).unwrap()
    }

    #[test]
    fn test_scenario_germany() {
        let table = fixture("scenario.csv");
        let germany = filter_by_country(&table, "Germany");

        let agg = aggregate(&germany).unwrap();

        assert_eq!(agg.country, "Germany");
        assert_eq!(agg.total_cases, 250);
        assert_eq!(agg.total_deaths, 15);
        assert_eq!(agg.death_rate, 0.06);
    }

    #[test]
    fn test_totals_match_sums() {
        let records = vec![
            record("Italy", "ITA", 1, 10, 1),
            record("Italy", "ITA", 2, 32, 4),
            record("Italy", "ITA", 3, 0, 2),
            record("Italy", "ITA", 4, 7, 0),
        ];

        let agg = aggregate(&records).unwrap();

        assert_eq!(agg.total_cases, records.iter().map(|r| r.cases).sum::<i64>());
        assert_eq!(agg.total_deaths, records.iter().map(|r| r.deaths).sum::<i64>());
    }

    #[test]
    fn test_rate_rounded_to_four_places() {
        let records = vec![record("Spain", "ESP", 1, 7, 3)];
        assert_eq!(aggregate(&records).unwrap().death_rate, 0.4286);
    }

    #[test]
    fn test_empty_input_is_no_records() {
        let records: Vec<CaseRecord> = Vec::new();
        assert_eq!(aggregate(&records), Err(AggregateError::NoRecords));
    }

    #[test]
    fn test_zero_cases_is_no_cases_not_zero_rate() {
        let table = fixture("zero_cases.csv");

        let result = aggregate(&table);

        assert_eq!(
            result,
            Err(AggregateError::NoCases {
                country: "Tuvalu".to_string()
            })
        );
    }

    #[test]
    fn test_inconsistent_codes_use_first() {
        let table = fixture("inconsistent_codes.csv");

        let agg = aggregate(&table).unwrap();

        assert_eq!(agg.geo_id.as_deref(), Some("XKX"));
        assert_eq!(agg.total_cases, 10);
        assert_eq!(agg.death_rate, 0.1);
    }

    #[test]
    fn test_more_deaths_than_cases_does_not_fail() {
        let records = vec![record("Yemen", "YEM", 1, 2, 5)];
        assert_eq!(aggregate(&records).unwrap().death_rate, 2.5);
    }

    #[test]
    fn test_aggregate_all_first_seen_order() {
        let table = fixture("ecdc_sample.csv");
        let all = aggregate_all(&table).unwrap();

        let names: Vec<_> = all.iter().map(|a| a.country.as_str()).collect();
        assert_eq!(names, vec!["Germany", "France", "Poland"]);

        assert_eq!(all[0].total_cases, 23335);
        assert_eq!(all[0].total_deaths, 583);
        assert_eq!(all[0].death_rate, 0.025);
        assert_eq!(all[0].geo_id.as_deref(), Some("DEU"));
        assert_eq!(all[0].population, Some(83019213));
        assert_eq!(all[1].death_rate, 0.1346);
        assert_eq!(all[2].death_rate, 0.0216);
    }

    #[test]
    fn test_aggregate_all_propagates_no_cases() {
        let table = vec![
            record("Germany", "DEU", 1, 10, 1),
            record("Tuvalu", "TUV", 1, 0, 0),
        ];

        let err = aggregate_all(&table).unwrap_err();
        assert!(matches!(err, AggregateError::NoCases { .. }));
        assert_eq!(err.country(), Some("Tuvalu"));
    }

    #[test]
    fn test_compare_per_million_and_shares() {
        let table = fixture("ecdc_sample.csv");
        let countries = vec![
            "Germany".to_string(),
            "France".to_string(),
            "Poland".to_string(),
        ];

        let rows = compare(&table, &countries).unwrap();

        let per_million: Vec<_> = rows.iter().map(|r| r.cases_per_million).collect();
        assert_eq!(per_million, vec![281, 378, 41]);
        let share_sum: f64 = rows.iter().map(|r| r.share).sum();
        assert!((share_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_unknown_country() {
        let table = fixture("ecdc_sample.csv");
        let result = compare(&table, &["Atlantis".to_string()]);

        assert_eq!(
            result,
            Err(AggregateError::UnknownCountry {
                country: "Atlantis".to_string()
            })
        );
    }

    #[test]
    fn test_compare_missing_population() {
        let table = fixture("scenario.csv");
        let result = compare(&table, &["Germany".to_string()]);

        assert!(matches!(result, Err(AggregateError::MissingPopulation { .. })));
    }

    #[test]
    fn test_sort_by_deaths() {
        let mut all = aggregate_all(&fixture("ecdc_sample.csv")).unwrap();
        sort_by_deaths(&mut all);

        assert_eq!(all[0].country, "France");
        assert_eq!(all[2].country, "Poland");
    }
}
