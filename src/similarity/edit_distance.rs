//! Classic edit distances, computed by `strsim`.

use super::{convert_edit_distance_to_similarity, EditDistance, Similarity};

/// Levenshtein distance: insertions, deletions and substitutions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl EditDistance for Levenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        strsim::levenshtein(a, b)
    }
}

impl Similarity for Levenshtein {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 100.0;
        }
        convert_edit_distance_to_similarity(self.distance(a, b), a, b)
    }

    fn name(&self) -> &'static str {
        "levenshtein"
    }
}

/// Damerau-Levenshtein distance (optimal string alignment): Levenshtein plus transposition of
/// two adjacent characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamerauLevenshtein;

impl EditDistance for DamerauLevenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        strsim::osa_distance(a, b)
    }
}

impl Similarity for DamerauLevenshtein {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 100.0;
        }
        convert_edit_distance_to_similarity(self.distance(a, b), a, b)
    }

    fn name(&self) -> &'static str {
        "damerau-levenshtein"
    }
}
