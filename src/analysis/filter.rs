//! Row selection by country.

use crate::models::CaseRecord;
use std::collections::{HashMap, HashSet};

/// Select every record whose country matches `country` exactly, keeping table order.
///
/// Returns an empty vector when nothing matches.
pub fn filter_by_country<'a>(table: &'a [CaseRecord], country: &str) -> Vec<&'a CaseRecord> {
    table.iter().filter(|r| r.country == country).collect()
}

/// Distinct country names in the order they first appear.
pub fn countries(table: &[CaseRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();

    table
        .iter()
        .map(|r| r.country.as_str())
        .filter(|country| seen.insert(*country))
        .collect()
}

/// Group records by country, in first-seen country order.
pub fn group_by_country(table: &[CaseRecord]) -> Vec<(&str, Vec<&CaseRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&CaseRecord>)> = Vec::new();

    for record in table {
        let slot = *index.entry(record.country.as_str()).or_insert_with(|| {
            groups.push((record.country.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    groups
}
