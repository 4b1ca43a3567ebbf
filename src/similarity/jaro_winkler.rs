//! Jaro-Winkler similarity
//!
//! The Jaro score counts characters that match within a sliding window and penalizes
//! transpositions among them. When the Jaro score reaches `threshold`, a bonus proportional to
//! the length of the common prefix is added. The bonus weight is `min(0.1, 1 / longest length)`,
//! which keeps the result at or below 100 without capping the prefix length.

use super::{count_to_f64, Similarity};

#[derive(Debug, Clone, Copy)]
pub struct JaroWinkler {
    /// Jaro score (0-1) from which the prefix bonus applies
    pub threshold: f64,
    /// Optional cap on the prefix length earning a bonus
    pub max_prefix: Option<usize>,
}

impl Default for JaroWinkler {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            max_prefix: None,
        }
    }
}

impl JaroWinkler {
    #[must_use]
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Raw Jaro-Winkler score between 0 and 1.
    #[must_use]
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        // Order the pair so that the result does not depend on argument order
        let (short, long) = if (a.len(), &a) <= (b.len(), &b) {
            (a, b)
        } else {
            (b, a)
        };

        let (matches, transpositions, prefix) = match_counts(&short, &long);
        if matches == 0 {
            return 0.0;
        }

        let m = count_to_f64(matches);
        let jaro = (m / count_to_f64(short.len())
            + m / count_to_f64(long.len())
            + (m - count_to_f64(transpositions)) / m)
            / 3.0;

        if jaro < self.threshold {
            return jaro;
        }
        let prefix = self.max_prefix.map_or(prefix, |cap| prefix.min(cap));
        let weight = (1.0 / count_to_f64(long.len())).min(0.1);
        jaro + weight * count_to_f64(prefix) * (1.0 - jaro)
    }
}

impl Similarity for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 100.0;
        }
        (100.0 * self.score(a, b)).clamp(0.0, 100.0)
    }

    fn name(&self) -> &'static str {
        "jaro-winkler"
    }
}

/// Returns (matching characters, transpositions, common prefix length).
fn match_counts(short: &[char], long: &[char]) -> (usize, usize, usize) {
    let range = (long.len() / 2).saturating_sub(1);
    let mut long_used = vec![false; long.len()];
    let mut short_matched = Vec::with_capacity(short.len());
    let mut short_flags = vec![false; short.len()];

    for (i, &c) in short.iter().enumerate() {
        let start = i.saturating_sub(range);
        let end = (i + range + 1).min(long.len());
        for j in start..end {
            if !long_used[j] && long[j] == c {
                long_used[j] = true;
                short_flags[i] = true;
                short_matched.push(c);
                break;
            }
        }
    }

    let long_matched = long
        .iter()
        .zip(&long_used)
        .filter(|(_, used)| **used)
        .map(|(c, _)| *c);
    let mismatched = short_matched
        .iter()
        .zip(long_matched)
        .filter(|(x, y)| **x != *y)
        .count();

    let prefix = short.iter().zip(long).take_while(|(x, y)| x == y).count();

    (short_matched.len(), mismatched / 2, prefix)
}
