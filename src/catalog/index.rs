use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::similarity::{ScientificNameSimilarity, Similarity};

use super::store::CandidateIndex;

/// Buckets larger than this are scored in parallel
const PARALLEL_BUCKET_SIZE: usize = 2048;

/// Settings for the secondary, similarity ranked lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuzzyConfig {
    /// Whether fuzzy lookup runs when the exact lookup finds nothing
    pub enabled: bool,
    /// Maximum number of index names re-queried
    pub top_k: usize,
    /// Minimum similarity (0-100) for an index name to be considered
    pub min_similarity: f64,
    /// Maximum difference in characters between query and index name
    pub max_length_delta: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 5,
            min_similarity: 60.0,
            max_length_delta: 4,
        }
    }
}

/// A normalized index name close to the query, with its similarity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameCandidate {
    pub name: String,
    pub similarity: f64,
}

/// Finds index names similar to a normalized query name
pub struct CandidateFinder<'a> {
    index: &'a CandidateIndex,
    metric: ScientificNameSimilarity,
    config: FuzzyConfig,
}

impl<'a> CandidateFinder<'a> {
    pub fn new(index: &'a CandidateIndex, config: FuzzyConfig) -> Self {
        Self {
            index,
            metric: ScientificNameSimilarity::new(),
            config,
        }
    }

    /// The most similar distinct index names, best first.
    ///
    /// Only names sharing the first character and within the length window are scored.
    /// Ties are broken by name so results are reproducible.
    #[must_use]
    pub fn find_similar_names(&self, normalized: &str) -> Vec<NameCandidate> {
        let Some(initial) = normalized.chars().next() else {
            return Vec::new();
        };
        let query_len = normalized.chars().count();
        let bucket = self.index.names_starting_with(initial);

        let score = |name: &String| -> Option<NameCandidate> {
            if name.chars().count().abs_diff(query_len) > self.config.max_length_delta {
                return None;
            }
            let similarity = self.metric.similarity(normalized, name);
            (similarity >= self.config.min_similarity).then(|| NameCandidate {
                name: name.clone(),
                similarity,
            })
        };

        let mut candidates: Vec<NameCandidate> = if bucket.len() > PARALLEL_BUCKET_SIZE {
            bucket.par_iter().filter_map(score).collect()
        } else {
            bucket.iter().filter_map(score).collect()
        };

        candidates.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.name.cmp(&b.name))
        });
        candidates.truncate(self.config.top_k);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Rank, TaxonomicStatus, UsageKey};
    use crate::core::usage::CandidateUsage;

    fn index() -> CandidateIndex {
        let names = [
            "Abies alba",
            "Abies alta",
            "Abies amabilis",
            "Albies alba",
            "Pinus alba",
            "Abies albanica",
        ];
        CandidateIndex::build(names.iter().enumerate().map(|(i, n)| {
            CandidateUsage::new(UsageKey(i as u64 + 1), *n, Rank::Species, TaxonomicStatus::Accepted)
        }))
        .unwrap()
    }

    #[test]
    fn test_find_similar_names() {
        let index = index();
        let finder = CandidateFinder::new(&index, FuzzyConfig::default());
        let found = finder.find_similar_names("abies alha");
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"abies alba"));
        assert!(names.contains(&"abies alta"));
        assert!(!names.contains(&"pinus alba"));
        for pair in found.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_top_k_and_floor() {
        let index = index();
        let config = FuzzyConfig {
            top_k: 1,
            ..FuzzyConfig::default()
        };
        let finder = CandidateFinder::new(&index, config);
        assert_eq!(finder.find_similar_names("abies alha").len(), 1);

        let strict = FuzzyConfig {
            min_similarity: 100.0,
            ..FuzzyConfig::default()
        };
        let finder = CandidateFinder::new(&index, strict);
        assert!(finder.find_similar_names("abies alha").is_empty());
        assert!(finder.find_similar_names("").is_empty());
    }

    #[test]
    fn test_ties_are_ordered_by_name() {
        let index = index();
        let finder = CandidateFinder::new(&index, FuzzyConfig::default());
        let found = finder.find_similar_names("abies alha");
        // "abies alba" and "abies alta" are both one substitution away
        assert_eq!(found[0].name, "abies alba");
        assert_eq!(found[1].name, "abies alta");
    }
}
