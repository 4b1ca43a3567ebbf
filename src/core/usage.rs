use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::classification::{Classification, HigherRank};
use crate::core::normalize::normalize;
use crate::core::types::{Rank, TaxonomicStatus, UsageKey};

/// A backbone name usage that incoming names can be matched to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateUsage {
    pub key: UsageKey,

    /// Name without authorship
    pub canonical_name: String,

    /// Index key derived from `canonical_name`
    #[serde(skip)]
    pub normalized_name: String,

    pub rank: Rank,

    pub status: TaxonomicStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket_authorship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket_year: Option<String>,

    /// Names of the higher taxa
    #[serde(default)]
    pub classification: Classification,

    /// Keys of the higher taxa
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub higher_keys: BTreeMap<HigherRank, UsageKey>,

    /// Accepted usage for synonyms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_key: Option<UsageKey>,
}

impl CandidateUsage {
    #[must_use]
    pub fn new(
        key: UsageKey,
        canonical_name: impl Into<String>,
        rank: Rank,
        status: TaxonomicStatus,
    ) -> Self {
        let canonical_name = canonical_name.into();
        Self {
            key,
            normalized_name: normalize(&canonical_name),
            canonical_name,
            rank,
            status,
            authorship: None,
            year: None,
            bracket_authorship: None,
            bracket_year: None,
            classification: Classification::default(),
            higher_keys: BTreeMap::new(),
            accepted_key: None,
        }
    }

    #[must_use]
    pub fn with_authorship(mut self, authorship: impl Into<String>) -> Self {
        self.authorship = Some(authorship.into());
        self
    }

    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    #[must_use]
    pub fn with_accepted(mut self, accepted: UsageKey) -> Self {
        self.accepted_key = Some(accepted);
        self
    }

    /// Recompute the cached index key, e.g. after deserialization.
    pub fn rebuild_normalized(&mut self) {
        self.normalized_name = normalize(&self.canonical_name);
    }

    /// Authorship including the basionym part, e.g. "(L.) Mill.".
    #[must_use]
    pub fn full_authorship(&self) -> Option<String> {
        let bracket = self.bracket_authorship.as_deref().filter(|s| !s.is_empty());
        let comb = self.authorship.as_deref().filter(|s| !s.is_empty());
        match (bracket, comb) {
            (Some(b), Some(c)) => Some(format!("({b}) {c}")),
            (Some(b), None) => Some(format!("({b})")),
            (None, Some(c)) => Some(c.to_string()),
            (None, None) => None,
        }
    }

    /// Whether the name is a binomial or trinomial
    #[must_use]
    pub fn is_binomial(&self) -> bool {
        self.canonical_name.split_whitespace().count() > 1
    }

    /// First token of the canonical name, lowercased
    #[must_use]
    pub fn genus_token(&self) -> Option<&str> {
        self.normalized_name.split(' ').next().filter(|s| !s.is_empty())
    }
}
