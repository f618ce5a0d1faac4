//! Counting table with a deterministic "most common first" order.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::keys::to_key_string;

/// Maps keys to non-negative counts.
///
/// Every report and dump iterates through [`FrequencyTable::most_common`],
/// so text output and JSON dumps always agree on order: count descending,
/// ties broken by key ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable<K: Eq + Hash> {
    counts: HashMap<K, u64>,
    total: u64,
}

impl<K: Eq + Hash> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
            total: 0,
        }
    }
}

impl<K: Eq + Hash> FrequencyTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    /// Add `amount` to the count of `key`.
    pub fn add(&mut self, key: K, amount: u64) {
        *self.counts.entry(key).or_insert(0) += amount;
        self.total += amount;
    }

    /// Count of `key`, zero if never seen.
    pub fn get<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Key-wise sum. Associative and commutative, so per-worker tables can
    /// be merged in any order.
    pub fn merge(&mut self, other: Self) {
        for (key, count) in other.counts {
            self.add(key, count);
        }
    }
}

impl<K: Eq + Hash + Ord> FrequencyTable<K> {
    /// All entries, most frequent first, ties by ascending key.
    pub fn most_common(&self) -> Vec<(&K, u64)> {
        let mut entries: Vec<(&K, u64)> = self.counts.iter().map(|(k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Keyed view for JSON dumps: composite keys become JSON strings.
    pub fn keyed(&self) -> KeyedTable<'_, K> {
        KeyedTable { table: self }
    }
}

impl<K: Eq + Hash> FromIterator<K> for FrequencyTable<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut table = Self::new();
        for key in iter {
            table.increment(key);
        }
        table
    }
}

/// Serializes a [`FrequencyTable`] as `{key_string: count}` in table order.
pub struct KeyedTable<'a, K: Eq + Hash> {
    table: &'a FrequencyTable<K>,
}

impl<K> Serialize for KeyedTable<'_, K>
where
    K: Eq + Hash + Ord + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.table.most_common();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, count) in entries {
            let key = to_key_string(key).map_err(serde::ser::Error::custom)?;
            map.serialize_entry(&key, &count)?;
        }
        map.end()
    }
}
