use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stable identifier of a backbone usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageKey(pub u64);

impl std::fmt::Display for UsageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UsageKey {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Identifier of a record inside a source dataset
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a source dataset (checklist)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetKey(pub String);

impl DatasetKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl std::fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Taxonomic rank, ordered from the highest to the lowest.
///
/// `InfragenericName` and `InfraspecificName` are the unspecific ranks used when a name is
/// known to sit below genus or species without a more precise marker. `Unranked` matches
/// every other rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Subfamily,
    Tribe,
    Genus,
    Subgenus,
    Section,
    InfragenericName,
    Species,
    Subspecies,
    Variety,
    Subvariety,
    Form,
    Subform,
    Cultivar,
    InfraspecificName,
    Unranked,
}

impl Rank {
    pub const ALL: [Rank; 20] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Subfamily,
        Rank::Tribe,
        Rank::Genus,
        Rank::Subgenus,
        Rank::Section,
        Rank::InfragenericName,
        Rank::Species,
        Rank::Subspecies,
        Rank::Variety,
        Rank::Subvariety,
        Rank::Form,
        Rank::Subform,
        Rank::Cultivar,
        Rank::InfraspecificName,
        Rank::Unranked,
    ];

    #[must_use]
    pub fn is_species_or_below(self) -> bool {
        self >= Rank::Species && self != Rank::Unranked
    }

    #[must_use]
    pub fn is_infraspecific(self) -> bool {
        self > Rank::Species && self != Rank::Unranked
    }

    /// Ranks above species, excluding `Unranked`.
    #[must_use]
    pub fn is_supraspecific(self) -> bool {
        self < Rank::Species
    }

    #[must_use]
    pub fn is_infrageneric(self) -> bool {
        self > Rank::Genus && self < Rank::Species
    }

    /// Whether two ranks can describe the same name.
    ///
    /// Unranked matches everything, the unspecific infrageneric and infraspecific ranks
    /// match any rank of their group.
    #[must_use]
    pub fn is_compatible(self, other: Rank) -> bool {
        if self == other || self == Rank::Unranked || other == Rank::Unranked {
            return true;
        }
        match (self, other) {
            (Rank::InfraspecificName, r) | (r, Rank::InfraspecificName) => r.is_infraspecific(),
            (Rank::InfragenericName, r) | (r, Rank::InfragenericName) => r.is_infrageneric(),
            _ => false,
        }
    }

    /// Parse a rank marker as it appears inside a scientific name (e.g. "subsp.", "var.").
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Rank> {
        let m = marker.trim().trim_end_matches('.').to_lowercase();
        let rank = match m.as_str() {
            "subgen" | "subg" => Rank::Subgenus,
            "sect" => Rank::Section,
            "sp" | "spec" => Rank::Species,
            "subsp" | "ssp" => Rank::Subspecies,
            "var" | "v" => Rank::Variety,
            "subvar" => Rank::Subvariety,
            "f" | "fo" | "forma" => Rank::Form,
            "subf" => Rank::Subform,
            "cv" => Rank::Cultivar,
            "infrasp" => Rank::InfraspecificName,
            _ => return None,
        };
        Some(rank)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Subfamily => "subfamily",
            Rank::Tribe => "tribe",
            Rank::Genus => "genus",
            Rank::Subgenus => "subgenus",
            Rank::Section => "section",
            Rank::InfragenericName => "infrageneric_name",
            Rank::Species => "species",
            Rank::Subspecies => "subspecies",
            Rank::Variety => "variety",
            Rank::Subvariety => "subvariety",
            Rank::Form => "form",
            Rank::Subform => "subform",
            Rank::Cultivar => "cultivar",
            Rank::InfraspecificName => "infraspecific_name",
            Rank::Unranked => "unranked",
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown rank: '{0}'")]
pub struct UnknownRank(pub String);

impl FromStr for Rank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace([' ', '-'], "_");
        if let Some(rank) = Rank::ALL.iter().find(|r| r.as_str() == lower) {
            return Ok(*rank);
        }
        match lower.as_str() {
            "infraspecific" | "infraspecificname" => Ok(Rank::InfraspecificName),
            "infrageneric" | "infragenericname" => Ok(Rank::InfragenericName),
            "division" => Ok(Rank::Phylum),
            "forma" => Ok(Rank::Form),
            "" | "no_rank" | "norank" => Ok(Rank::Unranked),
            _ => Rank::from_marker(&lower).ok_or_else(|| UnknownRank(s.to_string())),
        }
    }
}

/// Taxonomic status of a backbone usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomicStatus {
    Accepted,
    Doubtful,
    Synonym,
}

impl TaxonomicStatus {
    #[must_use]
    pub fn is_synonym(self) -> bool {
        matches!(self, Self::Synonym)
    }
}

impl std::fmt::Display for TaxonomicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Doubtful => write!(f, "doubtful"),
            Self::Synonym => write!(f, "synonym"),
        }
    }
}

impl FromStr for TaxonomicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "accepted" | "valid" => Ok(Self::Accepted),
            "doubtful" | "provisionally accepted" => Ok(Self::Doubtful),
            _ if lower.contains("synonym") || lower == "misapplied" => Ok(Self::Synonym),
            _ => Err(format!("Unknown taxonomic status: '{s}'")),
        }
    }
}

/// Three-valued comparison result.
///
/// `Unknown` means there was not enough information to decide, which is not the same as
/// `Equal`: two empty author strings are `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equality {
    Equal,
    Different,
    Unknown,
}

impl Equality {
    /// Combine two independent results: any `Different` wins, then any `Equal`.
    #[must_use]
    pub fn and(self, other: Equality) -> Equality {
        match (self, other) {
            (Equality::Different, _) | (_, Equality::Different) => Equality::Different,
            (Equality::Equal, _) | (_, Equality::Equal) => Equality::Equal,
            _ => Equality::Unknown,
        }
    }
}

impl std::fmt::Display for Equality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => write!(f, "EQUAL"),
            Self::Different => write!(f, "DIFFERENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// How the selected candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Normalized name found verbatim in the index
    Exact,
    /// Found through the similarity-ranked secondary lookup
    Fuzzy,
    /// The name itself is unknown, a higher taxon it belongs to was selected
    Higher,
    /// No candidate was selected
    None,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Higher => write!(f, "higher"),
            Self::None => write!(f, "none"),
        }
    }
}
