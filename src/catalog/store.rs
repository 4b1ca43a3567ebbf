use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::types::UsageKey;
use crate::core::usage::CandidateUsage;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read backbone: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse backbone: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid backbone row on line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    #[error("Duplicate usage key {0}")]
    DuplicateKey(UsageKey),

    #[error("Backbone too large: {0}")]
    TooManyRows(String),

    #[error("Unsupported backbone format: {0}")]
    UnsupportedFormat(String),
}

/// Index version for compatibility checking
pub const INDEX_VERSION: &str = "1.0.0";

/// Serializable backbone snapshot format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexData {
    pub version: String,
    pub created_at: String,
    pub usages: Vec<CandidateUsage>,
}

/// Read-only index of backbone usages keyed by normalized canonical name.
///
/// There is no mutation API. A changed backbone is loaded into a new index which then replaces
/// the old one through [`IndexHandle`](super::handle::IndexHandle).
#[derive(Debug, Default)]
pub struct CandidateIndex {
    /// All usages, sorted by key
    usages: Vec<CandidateUsage>,

    /// Index: usage key -> index in usages vec
    key_to_index: HashMap<UsageKey, usize>,

    /// Index: normalized canonical name -> indices of usages (homonyms share an entry)
    name_to_usages: HashMap<String, Vec<usize>>,

    /// Index: canonical name as given -> indices of usages
    canonical_to_usages: HashMap<String, Vec<usize>>,

    /// Distinct normalized names grouped by first character, sorted, for fuzzy lookups
    names_by_initial: BTreeMap<char, Vec<String>>,
}

impl CandidateIndex {
    /// Build the index in a single pass over all usages.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateKey` if two usages share a key.
    pub fn build(usages: impl IntoIterator<Item = CandidateUsage>) -> Result<Self, CatalogError> {
        let start = Instant::now();
        let mut usages: Vec<CandidateUsage> = usages.into_iter().collect();
        usages.sort_by_key(|u| u.key);

        let mut index = Self {
            usages: Vec::with_capacity(usages.len()),
            ..Self::default()
        };
        for mut usage in usages {
            if index.key_to_index.contains_key(&usage.key) {
                return Err(CatalogError::DuplicateKey(usage.key));
            }
            usage.rebuild_normalized();
            index.insert(usage);
        }

        for names in index.names_by_initial.values_mut() {
            names.sort_unstable();
        }

        info!(
            "Built candidate index with {} usages and {} distinct names in {:.2?}",
            index.len(),
            index.name_count(),
            start.elapsed()
        );
        Ok(index)
    }

    /// Load an index from a JSON snapshot file
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse an index from a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: IndexData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != INDEX_VERSION {
            warn!(
                "Backbone snapshot version mismatch (expected {}, found {})",
                INDEX_VERSION, data.version
            );
        }

        Self::build(data.usages)
    }

    /// Export the index to a JSON snapshot
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = IndexData {
            version: INDEX_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            usages: self.usages.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    fn insert(&mut self, usage: CandidateUsage) {
        let idx = self.usages.len();
        self.key_to_index.insert(usage.key, idx);

        let normalized = usage.normalized_name.clone();
        if let Some(initial) = normalized.chars().next() {
            let bucket = self.name_to_usages.entry(normalized.clone()).or_default();
            if bucket.is_empty() {
                self.names_by_initial
                    .entry(initial)
                    .or_default()
                    .push(normalized);
            }
            bucket.push(idx);
        }

        self.canonical_to_usages
            .entry(collapse_whitespace(&usage.canonical_name))
            .or_default()
            .push(idx);

        self.usages.push(usage);
    }

    /// Usages whose normalized canonical name equals `normalized`, ordered by key.
    #[must_use]
    pub fn lookup(&self, normalized: &str) -> Vec<&CandidateUsage> {
        self.resolve(self.name_to_usages.get(normalized))
    }

    /// Usages whose canonical name equals `name` exactly, ignoring surrounding and repeated
    /// whitespace.
    #[must_use]
    pub fn lookup_exact(&self, name: &str) -> Vec<&CandidateUsage> {
        self.resolve(self.canonical_to_usages.get(&collapse_whitespace(name)))
    }

    #[must_use]
    pub fn lookup_by_key(&self, key: UsageKey) -> Option<&CandidateUsage> {
        self.key_to_index.get(&key).map(|&idx| &self.usages[idx])
    }

    fn resolve(&self, indices: Option<&Vec<usize>>) -> Vec<&CandidateUsage> {
        indices
            .map(|ids| ids.iter().map(|&idx| &self.usages[idx]).collect())
            .unwrap_or_default()
    }

    /// Distinct normalized names starting with `initial`, sorted.
    #[must_use]
    pub fn names_starting_with(&self, initial: char) -> &[String] {
        self.names_by_initial
            .get(&initial)
            .map_or(&[], Vec::as_slice)
    }

    /// Iterate over all usages in key order
    pub fn iter(&self) -> impl Iterator<Item = &CandidateUsage> {
        self.usages.iter()
    }

    /// Number of usages in the index
    #[must_use]
    pub fn len(&self) -> usize {
        self.usages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Number of distinct normalized names
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.name_to_usages.len()
    }

    /// Number of normalized names shared by more than one usage
    #[must_use]
    pub fn homonym_count(&self) -> usize {
        self.name_to_usages.values().filter(|v| v.len() > 1).count()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Rank, TaxonomicStatus};

    fn usage(key: u64, name: &str, rank: Rank) -> CandidateUsage {
        CandidateUsage::new(UsageKey(key), name, rank, TaxonomicStatus::Accepted)
    }

    fn sample_index() -> CandidateIndex {
        CandidateIndex::build(vec![
            usage(3, "Abies alba", Rank::Species),
            usage(1, "Abies", Rank::Genus),
            usage(7, "Oenanthe", Rank::Genus),
            usage(5, "Oenanthe", Rank::Genus),
            usage(9, "Pinus sylvestris", Rank::Species),
        ])
        .unwrap()
    }

    #[test]
    fn test_every_name_is_found() {
        let index = sample_index();
        assert_eq!(index.len(), 5);
        assert_eq!(index.name_count(), 4);
        for u in index.iter() {
            assert!(!index.lookup(&u.normalized_name).is_empty());
        }
        assert!(index.lookup("quercus robur").is_empty());
        assert!(index.lookup("").is_empty());
    }

    #[test]
    fn test_homonyms_are_ordered_by_key() {
        let index = sample_index();
        let keys: Vec<u64> = index.lookup("oenanthe").iter().map(|u| u.key.0).collect();
        assert_eq!(keys, vec![5, 7]);
        assert_eq!(index.homonym_count(), 1);
    }

    #[test]
    fn test_lookup_exact_and_by_key() {
        let index = sample_index();
        assert_eq!(index.lookup_exact(" Abies   alba ").len(), 1);
        assert!(index.lookup_exact("abies alba").is_empty());
        assert_eq!(
            index.lookup_by_key(UsageKey(9)).map(|u| u.canonical_name.as_str()),
            Some("Pinus sylvestris")
        );
        assert!(index.lookup_by_key(UsageKey(2)).is_none());
    }

    #[test]
    fn test_names_by_initial() {
        let index = sample_index();
        assert_eq!(index.names_starting_with('a'), ["abies", "abies alba"]);
        assert!(index.names_starting_with('z').is_empty());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = CandidateIndex::build(vec![
            usage(1, "Abies", Rank::Genus),
            usage(1, "Pinus", Rank::Genus),
        ]);
        assert!(matches!(result, Err(CatalogError::DuplicateKey(UsageKey(1)))));
    }

    #[test]
    fn test_json_snapshot() {
        let index = sample_index();
        let json = index.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"usages\""));

        let reloaded = CandidateIndex::from_json(&json).unwrap();
        assert_eq!(reloaded.len(), index.len());
        assert_eq!(reloaded.lookup("abies alba").len(), 1);
    }
}
