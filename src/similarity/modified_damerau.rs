//! Damerau-Levenshtein variant that recognizes transposed blocks of characters.
//!
//! Besides single-character edits and adjacent swaps, two neighbouring blocks of up to
//! `block_limit` characters that appear swapped in the other string cost one edit plus one per
//! extra block character. The common prefix and suffix are stripped before the dynamic program
//! runs, and the matrix is allocated per call, so the metric is safe to share between threads.

use super::{convert_edit_distance_to_similarity, EditDistance, Similarity};

#[derive(Debug, Clone, Copy)]
pub struct ModifiedDamerauLevenshtein {
    block_limit: usize,
}

impl ModifiedDamerauLevenshtein {
    #[must_use]
    pub fn new(block_limit: usize) -> Self {
        Self {
            block_limit: block_limit.max(1),
        }
    }

    #[must_use]
    pub fn block_limit(&self) -> usize {
        self.block_limit
    }
}

impl Default for ModifiedDamerauLevenshtein {
    fn default() -> Self {
        Self::new(3)
    }
}

impl EditDistance for ModifiedDamerauLevenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        if a == b {
            return 0;
        }
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        block_distance(&a, &b, self.block_limit)
    }
}

impl Similarity for ModifiedDamerauLevenshtein {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 100.0;
        }
        convert_edit_distance_to_similarity(self.distance(a, b), a, b)
    }

    fn name(&self) -> &'static str {
        "modified-damerau-levenshtein"
    }
}

fn block_distance(a: &[char], b: &[char], block_limit: usize) -> usize {
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }
    if a.len() == 1 && b.len() == 1 {
        return usize::from(a[0] != b[0]);
    }

    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let a = &a[prefix..];
    let b = &b[prefix..];
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a = &a[..a.len() - suffix];
    let b = &b[..b.len() - suffix];

    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }
    if a.len() == 1 && b.len() == 1 {
        return 1;
    }

    let (l1, l2) = (a.len(), b.len());
    let cols = l2 + 1;
    let mut m = vec![0usize; (l1 + 1) * cols];
    for i in 0..=l1 {
        m[i * cols] = i;
    }
    for (j, cell) in m.iter_mut().enumerate().take(cols) {
        *cell = j;
    }

    let max_block = (l1 / 2).min(l2 / 2).min(block_limit).max(1);

    for i in 1..=l1 {
        for j in 1..=l2 {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let insertion = m[i * cols + j - 1] + 1;
            let deletion = m[(i - 1) * cols + j] + 1;

            let mut block = max_block;
            while block >= 1 {
                if i >= 2 * block && j >= 2 * block && blocks_swapped(a, b, i, j, block) {
                    let transposition = m[(i - 2 * block) * cols + j - 2 * block] + cost + block - 1;
                    m[i * cols + j] = insertion.min(deletion).min(transposition);
                    break;
                }
                if block == 1 {
                    let substitution = m[(i - 1) * cols + j - 1] + cost;
                    m[i * cols + j] = insertion.min(deletion).min(substitution);
                }
                block -= 1;
            }
        }
    }
    m[l1 * cols + l2]
}

/// Whether the two `len`-sized blocks ending at `a[..i]` appear in swapped order at `b[..j]`.
fn blocks_swapped(a: &[char], b: &[char], i: usize, j: usize, len: usize) -> bool {
    let a_first = &a[i - 2 * len..i - len];
    let a_second = &a[i - len..i];
    let b_first = &b[j - 2 * len..j - len];
    let b_second = &b[j - len..j];
    a_first == b_second && a_second == b_first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_distances() {
        let mdl = ModifiedDamerauLevenshtein::new(1);
        assert_eq!(mdl.distance("abies", "abies"), 0);
        assert_eq!(mdl.distance("", "abc"), 3);
        assert_eq!(mdl.distance("a", "b"), 1);
        assert_eq!(mdl.distance("alba", "alta"), 1);
        assert_eq!(mdl.distance("alba", "abla"), 1);
        assert_eq!(mdl.distance("caeruleus", "coeruleus"), 1);
        assert_eq!(mdl.distance("abcdefg", "abcdeg"), 1);
        assert_eq!(mdl.distance("linaria", "linariya"), 1);
    }

    #[test]
    fn test_block_transposition() {
        let single = ModifiedDamerauLevenshtein::new(1);
        let block = ModifiedDamerauLevenshtein::new(3);
        // "abxy" vs "xyab": two swapped blocks of two characters
        assert_eq!(block.distance("abxy", "xyab"), 2);
        assert!(single.distance("abxy", "xyab") > 2);
    }

    #[test]
    fn test_long_strings_do_not_overflow() {
        let a = "a".repeat(200) + "bc";
        let b = "a".repeat(200) + "cb";
        assert_eq!(ModifiedDamerauLevenshtein::new(1).distance(&a, &b), 1);
        let c: String = (0..150).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let d: String = c.chars().rev().collect();
        assert!(ModifiedDamerauLevenshtein::new(3).distance(&c, &d) > 0);
    }

    #[test]
    fn test_symmetry() {
        let mdl = ModifiedDamerauLevenshtein::default();
        for (a, b) in [("abxy", "xyab"), ("pedunculata", "pedinculata"), ("orei", "orfe")] {
            assert_eq!(mdl.distance(a, b), mdl.distance(b, a));
        }
    }

    #[test]
    fn test_concurrent_use() {
        let mdl = std::sync::Arc::new(ModifiedDamerauLevenshtein::new(1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mdl = std::sync::Arc::clone(&mdl);
                std::thread::spawn(move || mdl.distance("caeruleus", "coeruleus"))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 1);
        }
    }
}
