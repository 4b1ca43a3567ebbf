//! String similarity metrics tuned for biological names.
//!
//! Every metric implements [`Similarity`] and returns a score from 0 (unrelated) to 100
//! (identical). Metrics are stateless apart from their configuration, so a single instance can
//! be shared by any number of threads.
//!
//! - [`Levenshtein`] and [`DamerauLevenshtein`]: classic edit distances
//! - [`ModifiedDamerauLevenshtein`]: edit distance aware of swapped blocks of characters
//! - [`JaroWinkler`]: matching characters with a common prefix bonus
//! - [`ScientificNameSimilarity`]: genus and epithets scored separately
//!
//! ## Example
//!
//! ```rust
//! use nub_matcher::similarity::{ScientificNameSimilarity, Similarity};
//!
//! let sim = ScientificNameSimilarity::new();
//! assert!((sim.similarity("Abies alba", "Abies alta") - 95.0).abs() < 0.001);
//! ```

pub mod edit_distance;
pub mod jaro_winkler;
pub mod modified_damerau;
pub mod scientific_name;

pub use edit_distance::{DamerauLevenshtein, Levenshtein};
pub use jaro_winkler::JaroWinkler;
pub use modified_damerau::ModifiedDamerauLevenshtein;
pub use scientific_name::ScientificNameSimilarity;

/// Maximum number of characters that earn additional edit tolerance
const TOLERANCE_LENGTH_CAP: usize = 10;

/// Exponent applied to the edit count before scaling by length
const EDIT_EXPONENT: f64 = 1.4;

/// A similarity metric between two strings, scored 0 to 100.
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;

    /// Name of the metric for logging and output
    fn name(&self) -> &'static str;
}

/// Metrics that are based on an integer edit distance.
pub trait EditDistance: Similarity {
    fn distance(&self, a: &str, b: &str) -> usize;
}

#[inline]
pub(crate) fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Convert an edit distance into a 0-100 similarity.
///
/// The tolerated number of edits grows with the length of the shorter string, up to 10
/// characters. Edits are penalized superlinearly: `dist = edits^1.4 / L`, and any `dist > 1` or
/// `edits > L` scores 0.
#[must_use]
pub fn convert_edit_distance_to_similarity(edits: usize, a: &str, b: &str) -> f64 {
    if edits == 0 {
        return 100.0;
    }
    let len = TOLERANCE_LENGTH_CAP
        .min(a.chars().count())
        .min(b.chars().count());
    if len == 0 || edits > len {
        return 0.0;
    }
    let dist = count_to_f64(edits).powf(EDIT_EXPONENT) / count_to_f64(len);
    if dist > 1.0 {
        0.0
    } else {
        100.0 * (1.0 - dist)
    }
}

/// Selectable metric, used by the CLI and HTTP service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Levenshtein,
    Damerau,
    ModifiedDamerau,
    JaroWinkler,
    #[default]
    Scientific,
}

impl Metric {
    /// Instantiate the metric with its default parameters.
    #[must_use]
    pub fn build(self) -> Box<dyn Similarity> {
        match self {
            Metric::Levenshtein => Box::new(Levenshtein),
            Metric::Damerau => Box::new(DamerauLevenshtein),
            Metric::ModifiedDamerau => Box::new(ModifiedDamerauLevenshtein::default()),
            Metric::JaroWinkler => Box::new(JaroWinkler::default()),
            Metric::Scientific => Box::new(ScientificNameSimilarity::new()),
        }
    }
}
