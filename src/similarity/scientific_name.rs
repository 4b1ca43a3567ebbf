//! Composite similarity for scientific names.
//!
//! Both names are normalized with epithet stemming and split into tokens. Names with a
//! different number of tokens are compared as whole strings. Otherwise every token pair is
//! scored on its own:
//!
//! - the first character must match
//! - tokens shorter than 4 characters must be equal
//! - the first 4 characters may differ by at most one edit
//! - the whole token scores 100, 90 or 80 for 0, 1 or 2 edits, anything else is 0
//!
//! The genus (first token) is rescaled with `max(0, 2 * score - 100)`, so a marginal genus
//! cannot lift the overall score. The result is the mean of all token scores, clamped to 5 when
//! any token scored 0.

use super::{count_to_f64, EditDistance, ModifiedDamerauLevenshtein, Similarity};
use crate::core::normalize::normalize_stemmed;

const HEAD_LENGTH: usize = 4;
const MAX_HEAD_EDITS: usize = 1;
const REJECTED_NAME_CAP: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct ScientificNameSimilarity {
    token_distance: ModifiedDamerauLevenshtein,
    whole_name: ModifiedDamerauLevenshtein,
}

impl ScientificNameSimilarity {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_distance: ModifiedDamerauLevenshtein::new(1),
            whole_name: ModifiedDamerauLevenshtein::new(3),
        }
    }

    fn token_similarity(&self, a: &str, b: &str) -> f64 {
        let ac: Vec<char> = a.chars().collect();
        let bc: Vec<char> = b.chars().collect();

        if ac.first() != bc.first() {
            return 0.0;
        }
        if ac.len() < HEAD_LENGTH || bc.len() < HEAD_LENGTH {
            return if a == b { 100.0 } else { 0.0 };
        }

        let head_a: String = ac[..HEAD_LENGTH].iter().collect();
        let head_b: String = bc[..HEAD_LENGTH].iter().collect();
        if self.token_distance.distance(&head_a, &head_b) > MAX_HEAD_EDITS {
            return 0.0;
        }

        match self.token_distance.distance(a, b) {
            0 => 100.0,
            1 => 90.0,
            2 => 80.0,
            _ => 0.0,
        }
    }
}

impl Default for ScientificNameSimilarity {
    fn default() -> Self {
        Self::new()
    }
}

impl Similarity for ScientificNameSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 100.0;
        }
        let a = normalize_stemmed(a);
        let b = normalize_stemmed(b);
        if a == b {
            return 100.0;
        }

        let tokens_a: Vec<&str> = a.split(' ').collect();
        let tokens_b: Vec<&str> = b.split(' ').collect();
        if a.is_empty() || b.is_empty() || tokens_a.len() != tokens_b.len() {
            return self.whole_name.similarity(&a, &b);
        }

        let mut total = 0.0;
        let mut rejected = false;
        for (idx, (ta, tb)) in tokens_a.iter().zip(&tokens_b).enumerate() {
            let mut score = self.token_similarity(ta, tb);
            if idx == 0 {
                score = (2.0 * score - 100.0).max(0.0);
            }
            if score == 0.0 {
                rejected = true;
            }
            total += score;
        }

        let mean = total / count_to_f64(tokens_a.len());
        if rejected && mean > REJECTED_NAME_CAP {
            REJECTED_NAME_CAP
        } else {
            mean
        }
    }

    fn name(&self) -> &'static str {
        "scientific-name"
    }
}
