//! Application context.
//!
//! Owns the loaded table and exposes the named queries a presentation
//! layer calls into. Queries only borrow the table, so one context can
//! serve any number of them.

use crate::analysis::{self, AggregateError};
use crate::models::{
    CaseRecord, ChoroplethPoint, CountryAggregate, CountryComparison, DailyPoint, MapMetric,
    PerMillionPoint,
};
use crate::store::{self, StoreError};
use std::path::Path;
use tracing::info;

/// The current dataset and the queries that run over it.
#[derive(Debug, Clone)]
pub struct AppContext {
    table: Vec<CaseRecord>,
}

impl AppContext {
    /// Build a context from a fresh read of the dataset at `path`.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let table = store::load(path)?;
        info!("Loaded {} records from {}", table.len(), path.display());
        Ok(Self::from_records(table))
    }

    /// Build a context around records already in memory.
    pub fn from_records(table: Vec<CaseRecord>) -> Self {
        Self { table }
    }

    /// The whole table, in file order.
    pub fn records(&self) -> &[CaseRecord] {
        &self.table
    }

    /// Number of rows in the table.
    pub fn record_count(&self) -> usize {
        self.table.len()
    }

    /// Distinct countries, first-seen order.
    pub fn countries(&self) -> Vec<&str> {
        analysis::countries(&self.table)
    }

    /// Every row for `country`, in table order.
    pub fn records_for(&self, country: &str) -> Result<Vec<&CaseRecord>, AggregateError> {
        let records = analysis::filter_by_country(&self.table, country);
        if records.is_empty() {
            return Err(AggregateError::UnknownCountry {
                country: country.to_string(),
            });
        }
        Ok(records)
    }

    /// Totals and death rate for one country.
    pub fn aggregate(&self, country: &str) -> Result<CountryAggregate, AggregateError> {
        analysis::aggregate(&self.records_for(country)?)
    }

    /// Totals for every country.
    pub fn aggregate_all(&self) -> Result<Vec<CountryAggregate>, AggregateError> {
        analysis::aggregate_all(&self.table)
    }

    /// Daily cases and deaths for one country, oldest first.
    pub fn timeline(&self, country: &str) -> Result<Vec<DailyPoint>, AggregateError> {
        Ok(analysis::for_display(&self.records_for(country)?))
    }

    /// Daily figures per million inhabitants for one country, oldest first.
    pub fn per_million(&self, country: &str) -> Result<Vec<PerMillionPoint>, AggregateError> {
        analysis::per_million(&self.records_for(country)?)
    }

    /// Population-normalized comparison of `countries`.
    pub fn compare(&self, countries: &[String]) -> Result<Vec<CountryComparison>, AggregateError> {
        analysis::compare(&self.table, countries)
    }

    /// World map series for `metric`.
    pub fn choropleth(&self, metric: MapMetric) -> Result<Vec<ChoroplethPoint>, AggregateError> {
        Ok(analysis::choropleth(&self.aggregate_all()?, metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join("ecdc_sample.csv")
    }

    #[test]
    fn test_load_and_query() {
        let context = AppContext::load(&sample_path()).unwrap();

        assert_eq!(context.record_count(), 12);
        assert_eq!(context.countries(), vec!["Germany", "France", "Poland"]);

        let poland = context.aggregate("Poland").unwrap();
        assert_eq!(poland.total_cases, 1574);
        assert_eq!(poland.total_deaths, 34);
    }

    #[test]
    fn test_unknown_country() {
        let context = AppContext::load(&sample_path()).unwrap();

        assert_eq!(
            context.aggregate("Atlantis"),
            Err(AggregateError::UnknownCountry {
                country: "Atlantis".to_string()
            })
        );
        assert!(context.timeline("Atlantis").is_err());
    }

    #[test]
    fn test_timeline_is_chronological() {
        let context = AppContext::load(&sample_path()).unwrap();
        let timeline = context.timeline("France").unwrap();

        assert!(timeline.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(timeline.len(), 4);
    }

    #[test]
    fn test_queries_do_not_mutate_table() {
        let context = AppContext::load(&sample_path()).unwrap();
        let before = context.clone();

        let _ = context.aggregate_all();
        let _ = context.timeline("Germany");
        let _ = context.compare(&["Germany".to_string()]);

        assert_eq!(context.records(), before.records());
    }

    #[test]
    fn test_choropleth_covers_all_coded_countries() {
        let context = AppContext::load(&sample_path()).unwrap();
        let points = context.choropleth(MapMetric::DeathRate).unwrap();

        let codes: Vec<_> = points.iter().map(|p| p.geo_id.as_str()).collect();
        assert_eq!(codes, vec!["DEU", "FRA", "POL"]);
    }

    #[test]
    fn test_load_missing_dataset_fails() {
        let result = AppContext::load(Path::new("/nonexistent/covid_19_latest.csv"));
        assert!(result.is_err());
    }
}
