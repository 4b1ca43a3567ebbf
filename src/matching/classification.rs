//! Classification matcher.
//!
//! Compares the higher classification supplied with a query against the ancestry of a
//! candidate. Only ranks present on both sides take part; missing information is never a
//! conflict. The weighted agreement score only separates candidates that otherwise tie.

use crate::core::classification::{Classification, HigherRank};
use crate::core::usage::CandidateUsage;
use crate::core::types::Rank;

/// Per-rank comparison of a query classification with a candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationComparison {
    /// Ranks where both sides agree
    pub agreeing: Vec<HigherRank>,
    /// Ranks where both sides have a name and the names differ
    pub conflicting: Vec<HigherRank>,
}

impl ClassificationComparison {
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.conflicting.is_empty()
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.agreeing.iter().map(|r| r.weight()).sum()
    }
}

/// Compare every higher rank known on both sides.
#[must_use]
pub fn compare(candidate: &CandidateUsage, query: &Classification) -> ClassificationComparison {
    let mut result = ClassificationComparison::default();
    for rank in HigherRank::ALL {
        let Some(expected) = query.normalized(rank) else {
            continue;
        };
        let Some(actual) = candidate_value(candidate, rank) else {
            continue;
        };
        if expected == actual {
            result.agreeing.push(rank);
        } else {
            result.conflicting.push(rank);
        }
    }
    result
}

/// True when no rank present on both sides disagrees.
#[must_use]
pub fn compatible(candidate: &CandidateUsage, query: &Classification) -> bool {
    compare(candidate, query).is_compatible()
}

/// Sum of the weights of all agreeing ranks.
#[must_use]
pub fn score(candidate: &CandidateUsage, query: &Classification) -> f64 {
    compare(candidate, query).score()
}

/// A supraspecific query matched against a candidate carrying species level classification.
///
/// Only reported as a diagnostic, never used to exclude a candidate.
#[must_use]
pub fn has_species_conflict(query_rank: Option<Rank>, candidate: &CandidateUsage) -> bool {
    query_rank.is_some_and(Rank::is_supraspecific)
        && (candidate.classification.has_species() || candidate.rank.is_species_or_below())
}

/// A candidate's name at a higher rank. A candidate of that very rank is its own ancestor.
fn candidate_value(candidate: &CandidateUsage, rank: HigherRank) -> Option<String> {
    if let Some(value) = candidate.classification.normalized(rank) {
        return Some(value);
    }
    if candidate.rank != rank.rank() {
        return None;
    }
    Classification::new()
        .with(rank, candidate.canonical_name.clone())
        .normalized(rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{TaxonomicStatus, UsageKey};

    fn abies_alba() -> CandidateUsage {
        CandidateUsage::new(UsageKey(1), "Abies alba", Rank::Species, TaxonomicStatus::Accepted)
            .with_classification(
                Classification::new()
                    .with(HigherRank::Kingdom, "Plantae")
                    .with(HigherRank::Family, "Pinaceae")
                    .with(HigherRank::Genus, "Abies"),
            )
    }

    #[test]
    fn test_missing_information_is_compatible() {
        let c = abies_alba();
        assert!(compatible(&c, &Classification::new()));
        assert!(score(&c, &Classification::new()).abs() < 0.001);
        let query = Classification::new().with(HigherRank::Order, "Pinales");
        assert!(compatible(&c, &query));
    }

    #[test]
    fn test_agreement_is_weighted_by_rank() {
        let c = abies_alba();
        let kingdom = Classification::new().with(HigherRank::Kingdom, "plantae");
        let family = Classification::new().with(HigherRank::Family, "PINACEAE");
        assert!(compatible(&c, &kingdom));
        assert!(score(&c, &family) > score(&c, &kingdom));

        let both = family.with(HigherRank::Kingdom, "Plantae");
        assert!((score(&c, &both) - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_conflict() {
        let c = abies_alba();
        let query = Classification::new()
            .with(HigherRank::Kingdom, "Animalia")
            .with(HigherRank::Family, "Pinaceae");
        let cmp = compare(&c, &query);
        assert!(!cmp.is_compatible());
        assert_eq!(cmp.conflicting, vec![HigherRank::Kingdom]);
        assert_eq!(cmp.agreeing, vec![HigherRank::Family]);
    }

    #[test]
    fn test_incertae_sedis_kingdom_is_missing() {
        let c = abies_alba();
        let query = Classification::new().with(HigherRank::Kingdom, "Incertae sedis");
        assert!(compatible(&c, &query));
    }

    #[test]
    fn test_candidate_is_its_own_ancestor() {
        let genus = CandidateUsage::new(UsageKey(2), "Abies", Rank::Genus, TaxonomicStatus::Accepted);
        let query = Classification::new().with(HigherRank::Genus, "Pinus");
        assert!(!compatible(&genus, &query));
        let query = Classification::new().with(HigherRank::Genus, "Abies");
        assert!((score(&genus, &query) - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_species_conflict() {
        let c = abies_alba();
        assert!(has_species_conflict(Some(Rank::Genus), &c));
        assert!(!has_species_conflict(Some(Rank::Species), &c));
        assert!(!has_species_conflict(None, &c));
    }
}
