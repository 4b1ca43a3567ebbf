use serde::Serialize;

use crate::core::types::{Rank, UsageKey};

/// Diagnostic note explaining how a match decision came about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchNote {
    /// The name could not be parsed
    ParseFailed { message: String },

    /// Name written in a single case; matched as given without fuzzy lookup
    SingleCase,

    /// No exact candidate; these index names were tried instead
    FuzzyLookup { names: Vec<String> },

    /// A supraspecific query matched a candidate with species level classification
    SpeciesClassification { key: UsageKey },

    /// Query and candidate ranks do not agree
    RankMismatch {
        key: UsageKey,
        query_rank: Rank,
        candidate_rank: Rank,
    },

    /// Candidate dropped because its authorship differs while others remain
    AuthorConflict { key: UsageKey },

    /// Candidate dropped because its classification conflicts while a compatible one remains
    ClassificationConflict { key: UsageKey },

    /// Equally scored candidates with identical classification, the lowest key was selected
    TieBrokenByKey { keys: Vec<UsageKey> },

    /// The best candidate scored below the doubtful threshold
    BelowThreshold { key: UsageKey, confidence: f64 },

    /// The name was not matched, this higher taxon was selected instead
    HigherRank {
        key: UsageKey,
        name: String,
        rank: Rank,
    },
}

impl std::fmt::Display for MatchNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailed { message } => write!(f, "Name could not be parsed: {message}"),
            Self::SingleCase => write!(f, "Name is written in a single case and was not parsed"),
            Self::FuzzyLookup { names } => {
                write!(f, "No exact match, tried similar names: {}", names.join(", "))
            }
            Self::SpeciesClassification { key } => write!(
                f,
                "Candidate {key} has species level classification but the query is supraspecific"
            ),
            Self::RankMismatch {
                key,
                query_rank,
                candidate_rank,
            } => write!(
                f,
                "Candidate {key} has rank {candidate_rank}, query has rank {query_rank}"
            ),
            Self::AuthorConflict { key } => {
                write!(f, "Candidate {key} rejected: different authorship")
            }
            Self::ClassificationConflict { key } => {
                write!(f, "Candidate {key} rejected: conflicting classification")
            }
            Self::TieBrokenByKey { keys } => {
                let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
                write!(f, "Identical candidates {}, selected the lowest key", keys.join(", "))
            }
            Self::BelowThreshold { key, confidence } => write!(
                f,
                "Best candidate {key} scored {confidence:.1}, below the doubtful threshold"
            ),
            Self::HigherRank { key, name, rank } => {
                write!(f, "Name not found, matched to the {rank} {name} ({key})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let note = MatchNote::TieBrokenByKey {
            keys: vec![UsageKey(3), UsageKey(8)],
        };
        assert_eq!(
            note.to_string(),
            "Identical candidates 3, 8, selected the lowest key"
        );
        let note = MatchNote::RankMismatch {
            key: UsageKey(1),
            query_rank: Rank::Genus,
            candidate_rank: Rank::Species,
        };
        assert!(note.to_string().contains("rank species"));
        let note = MatchNote::HigherRank {
            key: UsageKey(30),
            name: "Pinaceae".to_string(),
            rank: Rank::Family,
        };
        assert_eq!(note.to_string(), "Name not found, matched to the family Pinaceae (30)");
    }

    #[test]
    fn test_serialize_tagged() {
        let note = MatchNote::AuthorConflict { key: UsageKey(42) };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, r#"{"type":"author_conflict","key":42}"#);
    }
}
