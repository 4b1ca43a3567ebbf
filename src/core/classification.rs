use serde::{Deserialize, Serialize};

use crate::core::normalize::fold_to_ascii;
use crate::core::types::Rank;

/// Higher ranks that can appear in a classification, from kingdom to subgenus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HigherRank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Subgenus,
}

impl HigherRank {
    pub const ALL: [HigherRank; 7] = [
        HigherRank::Kingdom,
        HigherRank::Phylum,
        HigherRank::Class,
        HigherRank::Order,
        HigherRank::Family,
        HigherRank::Genus,
        HigherRank::Subgenus,
    ];

    /// Tie-break weight of an agreeing rank; more specific ranks weigh more.
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            HigherRank::Kingdom => 1.0,
            HigherRank::Phylum => 2.0,
            HigherRank::Class => 3.0,
            HigherRank::Order => 4.0,
            HigherRank::Family => 5.0,
            HigherRank::Genus => 6.0,
            HigherRank::Subgenus => 7.0,
        }
    }

    #[must_use]
    pub fn rank(self) -> Rank {
        match self {
            HigherRank::Kingdom => Rank::Kingdom,
            HigherRank::Phylum => Rank::Phylum,
            HigherRank::Class => Rank::Class,
            HigherRank::Order => Rank::Order,
            HigherRank::Family => Rank::Family,
            HigherRank::Genus => Rank::Genus,
            HigherRank::Subgenus => Rank::Subgenus,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HigherRank::Kingdom => "kingdom",
            HigherRank::Phylum => "phylum",
            HigherRank::Class => "class",
            HigherRank::Order => "order",
            HigherRank::Family => "family",
            HigherRank::Genus => "genus",
            HigherRank::Subgenus => "subgenus",
        }
    }
}

/// Sparse higher classification of a name.
///
/// `species` is only set for infraspecific names and carries the binomial of the parent species.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgenus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

impl Classification {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, rank: HigherRank, name: impl Into<String>) -> Self {
        self.set(rank, Some(name.into()));
        self
    }

    /// Name at a higher rank, ignoring blank values.
    #[must_use]
    pub fn get(&self, rank: HigherRank) -> Option<&str> {
        let value = match rank {
            HigherRank::Kingdom => &self.kingdom,
            HigherRank::Phylum => &self.phylum,
            HigherRank::Class => &self.class,
            HigherRank::Order => &self.order,
            HigherRank::Family => &self.family,
            HigherRank::Genus => &self.genus,
            HigherRank::Subgenus => &self.subgenus,
        };
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, rank: HigherRank, name: Option<String>) {
        let slot = match rank {
            HigherRank::Kingdom => &mut self.kingdom,
            HigherRank::Phylum => &mut self.phylum,
            HigherRank::Class => &mut self.class,
            HigherRank::Order => &mut self.order,
            HigherRank::Family => &mut self.family,
            HigherRank::Genus => &mut self.genus,
            HigherRank::Subgenus => &mut self.subgenus,
        };
        *slot = name.filter(|s| !s.trim().is_empty());
    }

    /// Normalized name at a rank, as used for comparisons.
    #[must_use]
    pub fn normalized(&self, rank: HigherRank) -> Option<String> {
        let value = normalize_higher_name(self.get(rank)?);
        if rank == HigherRank::Kingdom && is_placeholder_kingdom(&value) {
            return None;
        }
        Some(value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        HigherRank::ALL.iter().all(|r| self.get(*r).is_none())
            && self.species.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Whether the classification reaches down to species level.
    #[must_use]
    pub fn has_species(&self) -> bool {
        self.species.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

fn normalize_higher_name(name: &str) -> String {
    fold_to_ascii(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_placeholder_kingdom(name: &str) -> bool {
    matches!(name, "incertae sedis" | "unknown" | "not assigned")
}
