//! Immutable version → endpoint mapping.

use std::collections::HashMap;

use crate::registry::endpoint::Endpoint;

/// Key used when no exact version entry exists.
pub const WILDCARD: &str = "*";

/// One complete routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: HashMap<String, Endpoint>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot routing every version to `endpoint`.
    pub fn wildcard(endpoint: Endpoint) -> Self {
        let mut snapshot = Self::new();
        snapshot.insert(WILDCARD, endpoint);
        snapshot
    }

    /// Add or overwrite an entry. Later inserts for the same version win.
    pub fn insert(&mut self, version: impl Into<String>, endpoint: Endpoint) -> Option<Endpoint> {
        self.entries.insert(version.into(), endpoint)
    }

    /// Exact match first, then the wildcard entry.
    pub fn resolve(&self, version: &str) -> Option<&Endpoint> {
        self.entries
            .get(version)
            .or_else(|| self.entries.get(WILDCARD))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by version, for stable log output.
    pub fn sorted_entries(&self) -> Vec<(&str, &Endpoint)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(version, endpoint)| (version.as_str(), endpoint))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl<K: Into<String>> FromIterator<(K, Endpoint)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, Endpoint)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (version, endpoint) in iter {
            snapshot.insert(version, endpoint);
        }
        snapshot
    }
}
