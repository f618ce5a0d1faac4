//! Archive-wide counting state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::table::FrequencyTable;
use crate::model::feature::FeatureTuple;
use crate::model::header::HeaderValues;

/// A header value that could not be normalized, kept for manual inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadHeader {
    /// Lowercased header name.
    pub header: String,
    /// The raw value as it appeared in the message.
    pub value: String,
    /// Why normalization failed.
    pub error: String,
}

/// The three frequency tables of one run, plus the bad-header log.
///
/// Owned by the scan driver and passed explicitly; independent aggregators
/// (e.g. one per worker) combine with [`Aggregator::merge`].
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    /// `(lowercased name, decoded values)` → number of messages.
    pub header_values: FrequencyTable<(String, HeaderValues)>,
    /// `(lowercased name, name as written)` → number of occurrences.
    pub header_variants: FrequencyTable<(String, String)>,
    /// Observed part features → number of parts.
    pub feature_tuples: FrequencyTable<FeatureTuple>,
    pub bad_headers: Vec<BadHeader>,
}

/// Entries of a `(name, value)` table that share the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<'a, V> {
    pub name: &'a str,
    pub total: u64,
    /// In table order.
    pub entries: Vec<(&'a V, u64)>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: Aggregator) {
        self.header_values.merge(other.header_values);
        self.header_variants.merge(other.header_variants);
        self.feature_tuples.merge(other.feature_tuples);
        self.bad_headers.extend(other.bad_headers);
    }

    pub fn record_bad_header(
        &mut self,
        header: impl Into<String>,
        value: impl Into<String>,
        error: impl ToString,
    ) {
        self.bad_headers.push(BadHeader {
            header: header.into(),
            value: value.into(),
            error: error.to_string(),
        });
    }

    /// Header values grouped by lowercased name.
    pub fn header_groups(&self) -> Vec<Group<'_, HeaderValues>> {
        group_by_name(&self.header_values)
    }

    /// Case variants grouped by lowercased name.
    pub fn variant_groups(&self) -> Vec<Group<'_, String>> {
        group_by_name(&self.header_variants)
    }

    /// `(lowercased name, total)` for every header, most frequent first.
    pub fn header_toplist(&self) -> Vec<(&str, u64)> {
        self.header_groups()
            .into_iter()
            .map(|g| (g.name, g.total))
            .collect()
    }
}

/// Split a `(name, value)` table into per-name groups.
///
/// Groups are ordered by total descending, ties by name ascending; entries
/// keep the table order.
pub fn group_by_name<V: Eq + std::hash::Hash + Ord>(
    table: &FrequencyTable<(String, V)>,
) -> Vec<Group<'_, V>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group<'_, V>> = Vec::new();

    for ((name, value), count) in table.most_common() {
        let slot = *index.entry(name.as_str()).or_insert_with(|| {
            groups.push(Group {
                name: name.as_str(),
                total: 0,
                entries: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += count;
        group.entries.push((value, count));
    }

    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(b.name)));
    groups
}
