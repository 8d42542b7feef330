//! Chart-ready series: chronological timelines, per-million
//! normalization, and choropleth points.

use crate::analysis::aggregator::{population_of, round_to, AggregateError};
use crate::models::{
    CaseRecord, ChoroplethPoint, CountryAggregate, DailyPoint, MapMetric, PerMillionPoint,
};
use std::borrow::Borrow;

/// Anything that can be placed on a timeline.
pub trait ToDailyPoint {
    fn to_point(&self) -> DailyPoint;
}

impl ToDailyPoint for CaseRecord {
    fn to_point(&self) -> DailyPoint {
        DailyPoint {
            date: self.date,
            cases: self.cases,
            deaths: self.deaths,
        }
    }
}

impl ToDailyPoint for DailyPoint {
    fn to_point(&self) -> DailyPoint {
        *self
    }
}

impl<T: ToDailyPoint + ?Sized> ToDailyPoint for &T {
    fn to_point(&self) -> DailyPoint {
        (**self).to_point()
    }
}

/// Order records oldest to newest.
///
/// The provider publishes newest first. The sort is stable, so rows sharing a
/// date keep their relative order.
pub fn for_display<T: ToDailyPoint>(records: &[T]) -> Vec<DailyPoint> {
    let mut points: Vec<DailyPoint> = records.iter().map(|r| r.to_point()).collect();
    points.sort_by_key(|p| p.date);
    points
}

/// Daily cases and deaths per million inhabitants, oldest first.
///
/// Each row is scaled by its own population figure, falling back to the
/// country's first known figure when the row has none.
pub fn per_million<R: Borrow<CaseRecord>>(
    records: &[R],
) -> Result<Vec<PerMillionPoint>, AggregateError> {
    let first: &CaseRecord = records.first().ok_or(AggregateError::NoRecords)?.borrow();
    let fallback = population_of(records).ok_or_else(|| AggregateError::MissingPopulation {
        country: first.country.clone(),
    })?;

    let mut points: Vec<PerMillionPoint> = records
        .iter()
        .map(|r| {
            let record: &CaseRecord = r.borrow();
            let population = record.population.filter(|p| *p > 0).unwrap_or(fallback) as f64;
            PerMillionPoint {
                date: record.date,
                cases_per_million: record.cases as f64 / population * 1_000_000.0,
                deaths_per_million: record.deaths as f64 / population * 1_000_000.0,
            }
        })
        .collect();

    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Map each aggregate to a choropleth point for `metric`.
///
/// Countries without a geographic code cannot be placed and are left out.
pub fn choropleth(aggregates: &[CountryAggregate], metric: MapMetric) -> Vec<ChoroplethPoint> {
    aggregates
        .iter()
        .filter_map(|agg| {
            let geo_id = agg.geo_id.clone()?;
            let (value, label) = match metric {
                MapMetric::TotalDeaths => (
                    agg.total_deaths as f64,
                    format!("{} : {} deaths", agg.country, agg.total_deaths),
                ),
                MapMetric::DeathRate => {
                    let percent = agg.death_rate_percent();
                    (percent, format!("{} : {}%", agg.country, round_to(percent, 3)))
                }
            };

            Some(ChoroplethPoint {
                geo_id,
                country: agg.country.clone(),
                value,
                label,
            })
        })
        .collect()
}
