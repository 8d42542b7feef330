//! Report generation.
//!
//! This module renders a [`Report`] as Markdown tables or pretty JSON.
//! The tables carry the same series the charts are drawn from.

use crate::models::{
    ChoroplethPoint, CountryAggregate, CountryComparison, DailyPoint, MapMetric, PerMillionPoint,
    Report, ReportBody, ReportMetadata,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# epistats Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    match &report.body {
        ReportBody::World { aggregates } => {
            output.push_str(&generate_world_section(aggregates));
        }
        ReportBody::Country {
            aggregate,
            timeline,
            per_million,
        } => {
            output.push_str(&generate_country_section(aggregate, timeline));
            if let Some(points) = per_million {
                output.push_str(&generate_per_million_section(points));
            }
        }
        ReportBody::Comparison { rows } => {
            output.push_str(&generate_comparison_section(rows));
        }
        ReportBody::Map { metric, points } => {
            output.push_str(&generate_map_section(*metric, points));
        }
    }

    output.push_str(&generate_footer());

    output
}

/// Headline for a country, as shown above its chart.
pub fn country_headline(aggregate: &CountryAggregate) -> String {
    format!(
        "{}: {} cases, {} deaths ({})",
        aggregate.country,
        aggregate.total_cases,
        aggregate.total_deaths,
        format_rate(aggregate.death_rate)
    )
}

fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset_path));
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!("- **Download:** {}\n", metadata.fetch_status));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", metadata.records_loaded));
    section.push_str(&format!("- **Countries:** {}\n", metadata.countries));
    section.push('\n');

    section
}

/// Generate the per-country totals table.
fn generate_world_section(aggregates: &[CountryAggregate]) -> String {
    let mut section = String::new();

    section.push_str("## World Totals\n\n");

    if aggregates.is_empty() {
        section.push_str("No countries in the dataset.\n\n");
        return section;
    }

    section.push_str("| # | Country | Code | Cases | Deaths | Death Rate | Cases / Million |\n");
    section.push_str("|---:|:---|:---:|---:|---:|---:|---:|\n");

    for (i, agg) in aggregates.iter().enumerate() {
        let per_million = agg
            .cases_per_million()
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());

        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            agg.country,
            agg.geo_id.as_deref().unwrap_or("-"),
            agg.total_cases,
            agg.total_deaths,
            format_rate(agg.death_rate),
            per_million
        ));
    }
    section.push('\n');

    section
}

/// Generate the single-country section.
fn generate_country_section(aggregate: &CountryAggregate, timeline: &[DailyPoint]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", aggregate.country));
    section.push_str(&format!("**{}**\n\n", country_headline(aggregate)));

    section.push_str("### Daily Cases and Deaths\n\n");
    section.push_str("| Date | Cases | Deaths |\n");
    section.push_str("|:---|---:|---:|\n");
    for point in timeline {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            point.date, point.cases, point.deaths
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-million table for a single country.
fn generate_per_million_section(points: &[PerMillionPoint]) -> String {
    let mut section = String::new();

    section.push_str("### Per Million Inhabitants\n\n");
    section.push_str("| Date | Cases / Million | Deaths / Million |\n");
    section.push_str("|:---|---:|---:|\n");
    for point in points {
        section.push_str(&format!(
            "| {} | {:.2} | {:.2} |\n",
            point.date, point.cases_per_million, point.deaths_per_million
        ));
    }
    section.push('\n');

    section
}

/// Generate the comparison table.
fn generate_comparison_section(rows: &[CountryComparison]) -> String {
    let mut section = String::new();

    section.push_str("## Comparison\n\n");
    section.push_str("| Country | Cases | Cases / Million | Share |\n");
    section.push_str("|:---|---:|---:|---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {:.1}% |\n",
            row.country,
            row.total_cases,
            row.cases_per_million,
            row.share * 100.0
        ));
    }
    section.push('\n');

    section
}

/// Generate the choropleth table.
fn generate_map_section(metric: MapMetric, points: &[ChoroplethPoint]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Map: {}\n\n", metric));
    section.push_str("| Code | Country | Value | Label |\n");
    section.push_str("|:---:|:---|---:|:---|\n");
    for point in points {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.geo_id, point.country, point.value, point.label
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Data: European Centre for Disease Prevention and Control (ECDC)*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchStatus;
    use chrono::{NaiveDate, Utc};

    fn create_metadata() -> ReportMetadata {
        ReportMetadata {
            dataset_path: "covid_19_latest.csv".to_string(),
            source: "https://opendata.ecdc.europa.eu/covid19/casedistribution/csv".to_string(),
            fetch_status: FetchStatus::Fetched { bytes: 1024 },
            generated_at: Utc::now(),
            records_loaded: 3,
            countries: 2,
        }
    }

    fn germany() -> CountryAggregate {
        CountryAggregate {
            country: "Germany".to_string(),
            geo_id: Some("DEU".to_string()),
            total_cases: 250,
            total_deaths: 15,
            death_rate: 0.06,
            population: Some(83019213),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    #[test]
    fn test_country_headline() {
        assert_eq!(
            country_headline(&germany()),
            "Germany: 250 cases, 15 deaths (6.00%)"
        );
    }

    #[test]
    fn test_generate_world_report() {
        let report = Report {
            metadata: create_metadata(),
            body: ReportBody::World {
                aggregates: vec![germany()],
            },
        };

        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# epistats Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## World Totals"));
        assert!(markdown.contains("| 1 | Germany | DEU | 250 | 15 | 6.00% | 3.0 |"));
    }

    #[test]
    fn test_generate_country_report() {
        let report = Report {
            metadata: create_metadata(),
            body: ReportBody::Country {
                aggregate: germany(),
                timeline: vec![
                    DailyPoint {
                        date: date(1),
                        cases: 100,
                        deaths: 5,
                    },
                    DailyPoint {
                        date: date(2),
                        cases: 150,
                        deaths: 10,
                    },
                ],
                per_million: None,
            },
        };

        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("## Germany"));
        assert!(markdown.contains("Germany: 250 cases, 15 deaths (6.00%)"));
        let first = markdown.find("| 2021-01-01 | 100 | 5 |").unwrap();
        let second = markdown.find("| 2021-01-02 | 150 | 10 |").unwrap();
        assert!(first < second);
        assert!(!markdown.contains("Per Million"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let mut metadata = create_metadata();
        metadata.fetch_status = FetchStatus::Failed {
            reason: "connection refused".to_string(),
        };

        let section = generate_metadata_section(&metadata);

        assert!(section.contains("covid_19_latest.csv"));
        assert!(section.contains("failed: connection refused"));
        assert!(section.contains("- **Countries:** 2"));
    }

    #[test]
    fn test_generate_comparison_section() {
        let rows = vec![CountryComparison {
            country: "Poland".to_string(),
            total_cases: 1574,
            cases_per_million: 41,
            share: 0.25,
        }];

        let section = generate_comparison_section(&rows);

        assert!(section.contains("| Poland | 1574 | 41 | 25.0% |"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = Report {
            metadata: create_metadata(),
            body: ReportBody::Map {
                metric: MapMetric::DeathRate,
                points: vec![ChoroplethPoint {
                    geo_id: "DEU".to_string(),
                    country: "Germany".to_string(),
                    value: 6.0,
                    label: "Germany : 6%".to_string(),
                }],
            },
        };

        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"view\": \"map\""));
        assert!(json.contains("\"metric\": \"death-rate\""));
        assert!(json.contains("\"geo_id\": \"DEU\""));
        assert!(json.contains("\"status\": \"fetched\""));
    }
}
