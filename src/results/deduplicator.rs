//! Order-preserving merge of identifier batches
//!
//! The first occurrence of a canonical identifier fixes its position, its raw
//! spelling and its provenance. Later duplicates are dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::canonical::CanonicalIdentifier;
use crate::crawl_engine::crawl_types::{LayerKind, TargetSource};

/// Where an identifier was first seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub layer: LayerKind,
    pub target: TargetSource,
    pub query: String,
}

impl Provenance {
    #[must_use]
    pub fn new(layer: LayerKind, target: TargetSource, query: impl Into<String>) -> Self {
        Self {
            layer,
            target,
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub id: CanonicalIdentifier,
    /// Spelling as first returned by a layer
    pub raw: String,
    pub provenance: Provenance,
}

/// Deduplicated, ordered identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResult {
    entries: Vec<ResultEntry>,
}

impl SearchResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultEntry> {
        self.entries.iter()
    }

    /// Canonical identifiers in order
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Raw spellings in order
    #[must_use]
    pub fn raw_values(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.raw.as_str()).collect()
    }

    /// Keep the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Keep only entries matching `keep`, preserving order
    #[must_use]
    pub fn filtered(self, mut keep: impl FnMut(&ResultEntry) -> bool) -> Self {
        Self {
            entries: self.entries.into_iter().filter(|e| keep(e)).collect(),
        }
    }
}

impl IntoIterator for SearchResult {
    type Item = ResultEntry;
    type IntoIter = std::vec::IntoIter<ResultEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResult {
    type Item = &'a ResultEntry;
    type IntoIter = std::slice::Iter<'a, ResultEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Incremental deduplicator
#[derive(Debug, Default)]
pub struct ResultDeduplicator {
    seen: HashSet<CanonicalIdentifier>,
    entries: Vec<ResultEntry>,
}

impl ResultDeduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add raw identifiers returned by one layer call
    ///
    /// Returns how many were new. Identifiers that normalize to nothing are
    /// ignored.
    pub fn push_batch<I, S>(&mut self, provenance: &Provenance, raws: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for raw in raws {
            let raw = raw.as_ref();
            let Some(id) = CanonicalIdentifier::parse(raw) else {
                continue;
            };
            if self.seen.insert(id.clone()) {
                self.entries.push(ResultEntry {
                    id,
                    raw: raw.trim().to_string(),
                    provenance: provenance.clone(),
                });
                added += 1;
            }
        }
        added
    }

    /// Add an already built result, keeping each entry's own provenance
    pub fn push_result(&mut self, result: SearchResult) -> usize {
        let mut added = 0;
        for entry in result {
            if self.seen.insert(entry.id.clone()) {
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> SearchResult {
        SearchResult {
            entries: self.entries,
        }
    }

    /// Merge batches in the given order
    #[must_use]
    pub fn merge(batches: impl IntoIterator<Item = SearchResult>) -> SearchResult {
        let mut dedup = Self::new();
        for batch in batches {
            dedup.push_result(batch);
        }
        dedup.finish()
    }
}
