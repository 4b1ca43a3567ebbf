use serde::Serialize;

use crate::core::classification::Classification;
use crate::core::name::ParsedName;
use crate::core::types::{Equality, MatchType, Rank, TaxonomicStatus};
use crate::core::usage::CandidateUsage;
use crate::matching::authorship::AuthorComparator;
use crate::matching::classification;
use crate::matching::engine::ScoringWeights;

/// What a candidate is scored against
#[derive(Debug, Clone)]
pub struct ScoringInput<'q> {
    /// Parsed query name including its authorship
    pub name: &'q ParsedName,
    /// Normalized query canonical name
    pub normalized: &'q str,
    pub rank: Option<Rank>,
    pub classification: &'q Classification,
}

/// Detailed score of one candidate
#[derive(Debug, Clone, Serialize)]
pub struct MatchScore {
    /// Similarity of the normalized names (100 for exact lookups)
    pub name_similarity: f64,

    /// Name component after fuzzy penalties and genus adjustment
    pub name_score: f64,

    /// Author comparison of query and candidate
    pub author: Equality,

    pub author_adjustment: f64,

    pub rank_adjustment: f64,

    /// Taxonomic status of the candidate: accepted above synonym above doubtful
    pub status_adjustment: f64,

    /// Whether the classifications agree on every shared rank
    pub classification_compatible: bool,

    /// Weighted agreement, used only to separate ties
    pub classification_score: f64,

    pub classification_adjustment: f64,

    /// Sum of all components, used for ranking
    pub raw: f64,

    /// `raw` clamped to 0-100, used for thresholds and reporting
    pub confidence: f64,
}

impl MatchScore {
    /// Score a candidate with the given weights.
    ///
    /// `name_similarity` is 100 for candidates found by exact lookup and the metric score for
    /// candidates found by fuzzy lookup.
    #[must_use]
    pub fn calculate(
        input: &ScoringInput<'_>,
        candidate: &CandidateUsage,
        match_type: MatchType,
        name_similarity: f64,
        authors: &AuthorComparator,
        weights: &ScoringWeights,
    ) -> Self {
        let name_score = name_score(input.normalized, candidate, match_type, name_similarity, weights);

        let author = authors.compare_names(input.name, &candidate_authorship(candidate));
        let author_adjustment = match author {
            Equality::Equal => weights.author_equal_bonus,
            Equality::Different => -weights.author_different_penalty,
            Equality::Unknown => 0.0,
        };

        let rank_adjustment = rank_adjustment(input.rank, candidate.rank, weights);
        let status_adjustment = status_adjustment(candidate.status, weights);

        let comparison = classification::compare(candidate, input.classification);
        let classification_compatible = comparison.is_compatible();
        let classification_adjustment = if classification_compatible {
            0.0
        } else {
            -weights.classification_conflict_penalty
        };

        let raw = name_score
            + author_adjustment
            + rank_adjustment
            + status_adjustment
            + classification_adjustment;

        Self {
            name_similarity,
            name_score,
            author,
            author_adjustment,
            rank_adjustment,
            status_adjustment,
            classification_compatible,
            classification_score: comparison.score(),
            classification_adjustment,
            raw,
            confidence: raw.clamp(0.0, 100.0),
        }
    }
}

/// Authorship of a backbone usage in the form the author comparator expects
#[must_use]
pub fn candidate_authorship(candidate: &CandidateUsage) -> ParsedName {
    ParsedName::with_authorship(candidate.authorship.as_deref(), candidate.year.as_deref())
        .with_bracket(
            candidate.bracket_authorship.as_deref(),
            candidate.bracket_year.as_deref(),
        )
}

fn name_score(
    normalized: &str,
    candidate: &CandidateUsage,
    match_type: MatchType,
    similarity: f64,
    weights: &ScoringWeights,
) -> f64 {
    if match_type != MatchType::Fuzzy {
        return similarity;
    }
    let query_genus = normalized.split(' ').next();
    let genus_adjustment = if query_genus.is_some() && query_genus == candidate.genus_token() {
        weights.genus_match_bonus
    } else {
        -weights.genus_mismatch_penalty
    };
    similarity - weights.fuzzy_base_penalty + genus_adjustment
}

#[must_use]
pub fn status_adjustment(status: TaxonomicStatus, weights: &ScoringWeights) -> f64 {
    match status {
        TaxonomicStatus::Accepted => weights.accepted_bonus,
        TaxonomicStatus::Synonym => 0.0,
        TaxonomicStatus::Doubtful => -weights.doubtful_status_penalty,
    }
}

/// Penalty for disagreeing ranks. An unknown query rank never penalizes.
#[must_use]
pub fn rank_adjustment(query: Option<Rank>, candidate: Rank, weights: &ScoringWeights) -> f64 {
    let Some(query) = query else {
        return 0.0;
    };
    if query.is_compatible(candidate) {
        return 0.0;
    }
    let species_vs_higher = (query.is_species_or_below() && candidate.is_supraspecific())
        || (query.is_supraspecific() && candidate.is_species_or_below());
    if species_vs_higher {
        -weights.supraspecific_penalty
    } else {
        -weights.rank_mismatch_penalty
    }
}
