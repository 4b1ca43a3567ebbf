use serde::{Deserialize, Serialize};

use crate::core::types::Rank;

/// A scientific name split into its parts.
///
/// Produced once by the name parser and read by the author comparator and the matching engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    /// The input string as given
    pub scientific_name: String,

    /// Genus or, for names above genus, the uninomial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrageneric: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_epithet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infraspecific_epithet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,

    /// Combination authorship
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    /// Basionym authorship, written in brackets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket_authorship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket_year: Option<String>,

    /// Whether the name carried a hybrid marker
    #[serde(default)]
    pub hybrid: bool,

    /// False when the name could not be split and only `scientific_name` is meaningful
    pub parsed: bool,
}

impl ParsedName {
    /// A name carrying only an authorship and year, as used for author comparisons.
    pub fn with_authorship(authorship: Option<&str>, year: Option<&str>) -> Self {
        Self {
            authorship: authorship.map(str::to_string),
            year: year.map(str::to_string),
            parsed: true,
            ..Self::default()
        }
    }

    /// Set the basionym authorship and year.
    #[must_use]
    pub fn with_bracket(mut self, authorship: Option<&str>, year: Option<&str>) -> Self {
        self.bracket_authorship = authorship.map(str::to_string);
        self.bracket_year = year.map(str::to_string);
        self
    }

    /// The name without authorship, e.g. "Abies alba".
    #[must_use]
    pub fn canonical_name(&self) -> String {
        [
            self.genus.as_deref(),
            self.specific_epithet.as_deref(),
            self.infraspecific_epithet.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Binomials and trinomials
    #[must_use]
    pub fn is_binomial(&self) -> bool {
        self.genus.is_some() && self.specific_epithet.is_some()
    }

    #[must_use]
    pub fn has_authorship(&self) -> bool {
        non_blank(self.authorship.as_deref()) || non_blank(self.year.as_deref())
    }

    #[must_use]
    pub fn has_bracket_authorship(&self) -> bool {
        non_blank(self.bracket_authorship.as_deref()) || non_blank(self.bracket_year.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}
