//! Registry entries and the view cache that mirrors the ledger.

use serde::{Deserialize, Serialize};

/// One row as the ledger returns it, before an index is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub owner_name: String,
    pub car_model: String,
}

impl RegistryRecord {
    pub fn new(owner_name: impl Into<String>, car_model: impl Into<String>) -> Self {
        Self { owner_name: owner_name.into(), car_model: car_model.into() }
    }
}

/// A registered vehicle. `index` is the zero-based insertion position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub index: u64,
    pub owner_name: String,
    pub car_model: String,
}

/// Snapshot of the ledger in ledger order. Only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCache {
    entries: Vec<Entry>,
}

impl ViewCache {
    pub fn new() -> Self { Self::default() }

    /// Replace the snapshot, indexing records by their position.
    pub fn replace(&mut self, records: Vec<RegistryRecord>) {
        self.entries = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| Entry { index: i as u64, owner_name: r.owner_name, car_model: r.car_model })
            .collect();
    }

    pub fn clear(&mut self) { self.entries.clear(); }

    pub fn entries(&self) -> &[Entry] { &self.entries }
    pub fn get(&self, index: usize) -> Option<&Entry> { self.entries.get(index) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
