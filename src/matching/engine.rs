use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::index::{CandidateFinder, FuzzyConfig};
use crate::catalog::store::CandidateIndex;
use crate::core::classification::{Classification, HigherRank};
use crate::core::name::ParsedName;
use crate::core::normalize::normalize;
use crate::core::types::{Equality, MatchType, Rank, UsageKey};
use crate::core::usage::CandidateUsage;
use crate::matching::authorship::AuthorComparator;
use crate::matching::classification::has_species_conflict;
use crate::matching::diagnosis::MatchNote;
use crate::matching::scoring::{candidate_authorship, MatchScore, ScoringInput};
use crate::parsing::name::{is_single_case, parse, parse_authorship, parse_unsplit};
use crate::utils::validation::{validate_name, ValidationError};

/// Scores closer than this are treated as equal
const SCORE_EPSILON: f64 = 1e-9;

/// Minimum confidence for a genus or classification name to stand in for an unknown name
pub const MIN_CONFIDENCE_FOR_HIGHER_MATCHES: f64 = 90.0;

/// Classification names tried for an unknown name, most specific first
const HIGHER_QUERY_RANKS: [HigherRank; 6] = [
    HigherRank::Genus,
    HigherRank::Family,
    HigherRank::Order,
    HigherRank::Class,
    HigherRank::Phylum,
    HigherRank::Kingdom,
];

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Candidate index not available")]
    IndexUnavailable,

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// A name to match, with the optional context that helps to pick between homonyms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameQuery {
    pub scientific_name: String,

    /// Authorship given separately; overrides any authorship inside `scientific_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,

    #[serde(default)]
    pub classification: Classification,
}

impl NameQuery {
    pub fn new(scientific_name: impl Into<String>) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_authorship(mut self, authorship: impl Into<String>) -> Self {
        self.authorship = Some(authorship.into());
        self
    }

    #[must_use]
    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = Some(rank);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }
}

/// A candidate together with its score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub usage: CandidateUsage,
    pub score: MatchScore,
}

impl ScoredCandidate {
    #[must_use]
    pub fn key(&self) -> UsageKey {
        self.usage.key
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.score.confidence
    }
}

/// Why no candidate was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    ParseFailed,
    NoCandidates,
    LowConfidence,
}

/// Terminal decision for one query
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum MatchOutcome {
    Match(ScoredCandidate),
    /// Always at least two candidates
    Ambiguous(Vec<ScoredCandidate>),
    Doubtful(ScoredCandidate),
    NoMatch(NoMatchReason),
}

impl MatchOutcome {
    /// The candidate a relation should be written for
    #[must_use]
    pub fn selected(&self) -> Option<&ScoredCandidate> {
        match self {
            Self::Match(c) | Self::Doubtful(c) => Some(c),
            Self::Ambiguous(_) | Self::NoMatch(_) => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Match(_) => "match",
            Self::Ambiguous(_) => "ambiguous",
            Self::Doubtful(_) => "doubtful",
            Self::NoMatch(NoMatchReason::ParseFailed) => "parse_failed",
            Self::NoMatch(_) => "no_match",
        }
    }
}

/// Result of matching one query against the index
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub query: String,
    pub outcome: MatchOutcome,
    pub match_type: MatchType,
    pub notes: Vec<MatchNote>,
    /// Candidates scored before filtering
    pub candidate_count: usize,
}

impl MatchResult {
    fn no_match(query: &str, reason: NoMatchReason, notes: Vec<MatchNote>) -> Self {
        Self {
            query: query.to_string(),
            outcome: MatchOutcome::NoMatch(reason),
            match_type: MatchType::None,
            notes,
            candidate_count: 0,
        }
    }
}

/// Configuration for the matching engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    /// Minimum confidence for a `Match`
    pub strict_threshold: f64,
    /// Minimum confidence for a `Doubtful` match
    pub doubtful_threshold: f64,
    pub fuzzy: FuzzyConfig,
    /// Fall back to the species, the genus or the classification of names that are not found
    pub higher_ranks: bool,
    pub scoring: ScoringWeights,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strict_threshold: 80.0,
            doubtful_threshold: 50.0,
            fuzzy: FuzzyConfig::default(),
            higher_ranks: true,
            scoring: ScoringWeights::default(),
        }
    }
}

impl MatchingConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.scoring = config.scoring.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds are within 0-100 and ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.strict_threshold) || !in_range(self.doubtful_threshold) {
            return Err(ConfigError::Invalid(
                "thresholds must be between 0 and 100".to_string(),
            ));
        }
        if self.doubtful_threshold > self.strict_threshold {
            return Err(ConfigError::Invalid(format!(
                "doubtful threshold {} exceeds strict threshold {}",
                self.doubtful_threshold, self.strict_threshold
            )));
        }
        if !in_range(self.fuzzy.min_similarity) {
            return Err(ConfigError::Invalid(
                "fuzzy min_similarity must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configurable adjustments applied to the name score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    pub author_equal_bonus: f64,
    pub author_different_penalty: f64,
    pub classification_conflict_penalty: f64,
    /// Ranks of the same group that disagree, e.g. variety vs subspecies
    pub rank_mismatch_penalty: f64,
    /// Species level against supraspecific rank
    pub supraspecific_penalty: f64,
    pub genus_match_bonus: f64,
    pub genus_mismatch_penalty: f64,
    /// Subtracted from the similarity of every fuzzy candidate
    pub fuzzy_base_penalty: f64,
    /// Added for accepted usages so they win over synonyms of the same name
    pub accepted_bonus: f64,
    pub doubtful_status_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            author_equal_bonus: 5.0,
            author_different_penalty: 25.0,
            classification_conflict_penalty: 25.0,
            rank_mismatch_penalty: 10.0,
            supraspecific_penalty: 30.0,
            genus_match_bonus: 5.0,
            genus_mismatch_penalty: 10.0,
            fuzzy_base_penalty: 5.0,
            accepted_bonus: 1.0,
            doubtful_status_penalty: 5.0,
        }
    }
}

impl ScoringWeights {
    /// Clamp all weights to non-negative values; penalties are always subtracted
    #[must_use]
    pub fn normalized(&self) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            author_equal_bonus: clamp(self.author_equal_bonus),
            author_different_penalty: clamp(self.author_different_penalty),
            classification_conflict_penalty: clamp(self.classification_conflict_penalty),
            rank_mismatch_penalty: clamp(self.rank_mismatch_penalty),
            supraspecific_penalty: clamp(self.supraspecific_penalty),
            genus_match_bonus: clamp(self.genus_match_bonus),
            genus_mismatch_penalty: clamp(self.genus_mismatch_penalty),
            fuzzy_base_penalty: clamp(self.fuzzy_base_penalty),
            accepted_bonus: clamp(self.accepted_bonus),
            doubtful_status_penalty: clamp(self.doubtful_status_penalty),
        }
    }
}

/// One name looked up against the index, with the context it is scored against
struct Lookup<'q> {
    name: &'q ParsedName,
    normalized: String,
    rank: Option<Rank>,
    classification: &'q Classification,
    fuzzy: bool,
}

struct Attempt {
    outcome: MatchOutcome,
    match_type: MatchType,
    candidate_count: usize,
}

/// The per-name matching engine
pub struct MatchingEngine<'a> {
    index: &'a CandidateIndex,
    /// Configuration including scoring weights and thresholds
    config: MatchingConfig,
    authors: AuthorComparator,
}

impl<'a> MatchingEngine<'a> {
    /// Create a new matching engine with default configuration
    pub fn new(index: &'a CandidateIndex) -> Self {
        Self::with_config(index, MatchingConfig::default())
    }

    /// Create a new matching engine with custom configuration
    pub fn with_config(index: &'a CandidateIndex, config: MatchingConfig) -> Self {
        Self {
            index,
            config,
            authors: AuthorComparator::default(),
        }
    }

    /// Use an author comparator with an abbreviation map
    #[must_use]
    pub fn with_authors(mut self, authors: AuthorComparator) -> Self {
        self.authors = authors;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Match a single name.
    ///
    /// Unparsable names and names without a usable candidate are reported as `NoMatch`;
    /// only invalid input is an error. Names that are not found may still match a higher
    /// taxon, reported with `MatchType::Higher`.
    pub fn match_name(&self, query: &NameQuery) -> Result<MatchResult, MatchError> {
        validate_name(&query.scientific_name)?;
        if let Some(authorship) = &query.authorship {
            validate_name(authorship)?;
        }

        // Genus, epithets and authors are told apart by case
        let single_case = is_single_case(query.scientific_name.trim());
        let parsed = if single_case {
            parse_unsplit(&query.scientific_name)
        } else {
            parse(&query.scientific_name)
        };
        let mut name = match parsed {
            Ok(name) => name,
            Err(e) => {
                debug!("Failed to parse {:?}: {e}", query.scientific_name);
                return Ok(MatchResult::no_match(
                    &query.scientific_name,
                    NoMatchReason::ParseFailed,
                    vec![MatchNote::ParseFailed {
                        message: e.to_string(),
                    }],
                ));
            }
        };
        if let Some(authorship) = query.authorship.as_deref().filter(|a| !a.trim().is_empty()) {
            apply_authorship(&mut name, &parse_authorship(authorship));
        }

        let mut notes = Vec::new();
        let lookup = if single_case {
            notes.push(MatchNote::SingleCase);
            Lookup {
                name: &name,
                normalized: normalize(&name.scientific_name),
                rank: Some(query.rank.unwrap_or(Rank::Unranked)),
                classification: &query.classification,
                fuzzy: false,
            }
        } else {
            Lookup {
                name: &name,
                normalized: normalize(&name.canonical_name()),
                rank: query.rank.or(name.rank),
                classification: &query.classification,
                fuzzy: self.config.fuzzy.enabled,
            }
        };

        let mut attempt = self.attempt(&lookup, &mut notes);
        if self.config.higher_ranks
            && matches!(
                attempt.outcome,
                MatchOutcome::NoMatch(NoMatchReason::NoCandidates | NoMatchReason::LowConfidence)
            )
        {
            if let Some(higher) = self.match_higher(&lookup, &mut notes) {
                attempt = higher;
            }
        }

        Ok(MatchResult {
            query: query.scientific_name.clone(),
            outcome: attempt.outcome,
            match_type: attempt.match_type,
            notes,
            candidate_count: attempt.candidate_count,
        })
    }

    /// Find, score, filter and decide the candidates of one lookup.
    fn attempt(&self, lookup: &Lookup<'_>, notes: &mut Vec<MatchNote>) -> Attempt {
        let (found, match_type) = self.find_candidates(&lookup.normalized, lookup.fuzzy, notes);
        if found.is_empty() {
            return Attempt {
                outcome: MatchOutcome::NoMatch(NoMatchReason::NoCandidates),
                match_type: MatchType::None,
                candidate_count: 0,
            };
        }

        let rank = lookup.rank;
        let input = ScoringInput {
            name: lookup.name,
            normalized: &lookup.normalized,
            rank,
            classification: lookup.classification,
        };
        let scored: Vec<ScoredCandidate> = found
            .into_iter()
            .map(|(usage, similarity)| {
                if has_species_conflict(rank, usage) {
                    notes.push(MatchNote::SpeciesClassification { key: usage.key });
                }
                if let Some(query_rank) = rank.filter(|r| !r.is_compatible(usage.rank)) {
                    notes.push(MatchNote::RankMismatch {
                        key: usage.key,
                        query_rank,
                        candidate_rank: usage.rank,
                    });
                }
                ScoredCandidate {
                    usage: usage.clone(),
                    score: MatchScore::calculate(
                        &input,
                        usage,
                        match_type,
                        similarity,
                        &self.authors,
                        &self.config.scoring,
                    ),
                }
            })
            .collect();
        let candidate_count = scored.len();

        let mut remaining = apply_hard_filters(scored, notes);
        sort_candidates(&mut remaining);

        let outcome = self.decide(remaining, notes);
        Attempt {
            match_type: if matches!(outcome, MatchOutcome::NoMatch(_)) {
                MatchType::None
            } else {
                match_type
            },
            outcome,
            candidate_count,
        }
    }

    /// Try the species of an infraspecific name, then the genus, then the names of the
    /// query classification from genus up to kingdom.
    fn match_higher(&self, lookup: &Lookup<'_>, notes: &mut Vec<MatchNote>) -> Option<Attempt> {
        let name = lookup.name;
        let unnamed = ParsedName::default();
        let higher = |normalized: String, rank: Option<Rank>, fuzzy: bool| Lookup {
            name: &unnamed,
            normalized,
            rank,
            classification: lookup.classification,
            fuzzy,
        };

        let mut supra_generic_only = false;
        if let Some(genus) = name.genus.as_deref() {
            if name.specific_epithet.is_some() || lookup.rank.is_some_and(Rank::is_infrageneric) {
                let infraspecific = name.infraspecific_epithet.is_some()
                    || lookup.rank.is_some_and(Rank::is_infraspecific);
                if let Some(epithet) = name.specific_epithet.as_deref().filter(|_| infraspecific) {
                    let species = higher(
                        normalize(&format!("{genus} {epithet}")),
                        Some(Rank::Species),
                        self.config.fuzzy.enabled,
                    );
                    if let Some(found) = self.accept_higher(&species, 0.0, notes) {
                        return Some(found);
                    }
                }
                let genus = higher(normalize(genus), None, false);
                if let Some(found) =
                    self.accept_higher(&genus, MIN_CONFIDENCE_FOR_HIGHER_MATCHES, notes)
                {
                    return Some(found);
                }
                supra_generic_only = true;
            }
        }

        for rank in HIGHER_QUERY_RANKS {
            if supra_generic_only && rank == HigherRank::Genus {
                continue;
            }
            let Some(value) = lookup.classification.get(rank) else {
                continue;
            };
            let classified = higher(normalize(value), Some(rank.rank()), false);
            if let Some(found) =
                self.accept_higher(&classified, MIN_CONFIDENCE_FOR_HIGHER_MATCHES, notes)
            {
                return Some(found);
            }
        }
        None
    }

    /// Run a higher taxon lookup and keep it if a candidate is selected with enough confidence.
    fn accept_higher(
        &self,
        lookup: &Lookup<'_>,
        min_confidence: f64,
        notes: &mut Vec<MatchNote>,
    ) -> Option<Attempt> {
        let mut higher_notes = Vec::new();
        let attempt = self.attempt(lookup, &mut higher_notes);
        let selected = attempt.outcome.selected()?;
        if selected.confidence() < min_confidence {
            return None;
        }
        debug!(
            "Matched higher taxon {} ({}) with confidence {:.1}",
            selected.usage.canonical_name,
            selected.key(),
            selected.confidence()
        );
        notes.push(MatchNote::HigherRank {
            key: selected.key(),
            name: selected.usage.canonical_name.clone(),
            rank: selected.usage.rank,
        });
        notes.extend(higher_notes);
        Some(Attempt {
            match_type: MatchType::Higher,
            ..attempt
        })
    }

    /// Exact lookup first, then the top-k most similar index names.
    fn find_candidates(
        &self,
        normalized: &str,
        fuzzy: bool,
        notes: &mut Vec<MatchNote>,
    ) -> (Vec<(&'a CandidateUsage, f64)>, MatchType) {
        let exact = self.index.lookup(normalized);
        if !exact.is_empty() || !fuzzy {
            return (
                exact.into_iter().map(|u| (u, 100.0)).collect(),
                MatchType::Exact,
            );
        }

        let finder = CandidateFinder::new(self.index, self.config.fuzzy.clone());
        let similar = finder.find_similar_names(normalized);
        if similar.is_empty() {
            return (Vec::new(), MatchType::None);
        }
        notes.push(MatchNote::FuzzyLookup {
            names: similar.iter().map(|c| c.name.clone()).collect(),
        });
        let found = similar
            .iter()
            .flat_map(|c| {
                self.index
                    .lookup(&c.name)
                    .into_iter()
                    .map(move |u| (u, c.similarity))
            })
            .collect();
        (found, MatchType::Fuzzy)
    }

    fn decide(&self, ranked: Vec<ScoredCandidate>, notes: &mut Vec<MatchNote>) -> MatchOutcome {
        let Some(best) = ranked.first() else {
            return MatchOutcome::NoMatch(NoMatchReason::NoCandidates);
        };
        if best.confidence() < self.config.doubtful_threshold {
            notes.push(MatchNote::BelowThreshold {
                key: best.key(),
                confidence: best.confidence(),
            });
            return MatchOutcome::NoMatch(NoMatchReason::LowConfidence);
        }

        let tied = ranked
            .iter()
            .take_while(|c| {
                (c.score.raw - best.score.raw).abs() < SCORE_EPSILON
                    && (c.score.classification_score - best.score.classification_score).abs()
                        < SCORE_EPSILON
            })
            .count();

        let mut ranked = ranked;
        if tied > 1 {
            let top = &ranked[..tied];
            if self.interchangeable(top) {
                notes.push(MatchNote::TieBrokenByKey {
                    keys: top.iter().map(ScoredCandidate::key).collect(),
                });
            } else {
                ranked.truncate(tied);
                return MatchOutcome::Ambiguous(ranked);
            }
        }

        let best = ranked.swap_remove(0);
        if best.confidence() >= self.config.strict_threshold {
            MatchOutcome::Match(best)
        } else {
            MatchOutcome::Doubtful(best)
        }
    }

    /// Tied candidates that share their classification and whose authors do not conflict
    /// can be told apart by key alone.
    fn interchangeable(&self, tied: &[ScoredCandidate]) -> bool {
        let first = &tied[0].usage;
        let same_classification = tied[1..]
            .iter()
            .all(|c| same_classification(&first.classification, &c.usage.classification));
        if !same_classification {
            return false;
        }
        for (i, a) in tied.iter().enumerate() {
            let authors_a = candidate_authorship(&a.usage);
            for b in &tied[i + 1..] {
                let authors_b = candidate_authorship(&b.usage);
                if self.authors.compare_names(&authors_a, &authors_b) == Equality::Different {
                    return false;
                }
            }
        }
        true
    }
}

fn apply_authorship(name: &mut ParsedName, authorship: &ParsedName) {
    name.authorship.clone_from(&authorship.authorship);
    name.year.clone_from(&authorship.year);
    name.bracket_authorship.clone_from(&authorship.bracket_authorship);
    name.bracket_year.clone_from(&authorship.bracket_year);
}

fn same_classification(a: &Classification, b: &Classification) -> bool {
    HigherRank::ALL
        .iter()
        .all(|r| a.normalized(*r) == b.normalized(*r))
}

/// Within candidates of equal name score, drop those with conflicting authors and then those
/// with a conflicting classification, as long as a better candidate remains.
fn apply_hard_filters(
    scored: Vec<ScoredCandidate>,
    notes: &mut Vec<MatchNote>,
) -> Vec<ScoredCandidate> {
    let mut groups: Vec<Vec<ScoredCandidate>> = Vec::new();
    for candidate in scored {
        match groups.iter_mut().find(|g| {
            (g[0].score.name_score - candidate.score.name_score).abs() < SCORE_EPSILON
        }) {
            Some(group) => group.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }

    let mut remaining = Vec::new();
    for group in groups {
        let group = retain_if_any(group, notes, |c| c.score.author != Equality::Different, |key| {
            MatchNote::AuthorConflict { key }
        });
        let group = retain_if_any(
            group,
            notes,
            |c| c.score.classification_compatible || c.score.author == Equality::Equal,
            |key| MatchNote::ClassificationConflict { key },
        );
        remaining.extend(group);
    }
    remaining
}

/// Keep the candidates passing `keep`, unless none does.
fn retain_if_any(
    group: Vec<ScoredCandidate>,
    notes: &mut Vec<MatchNote>,
    keep: impl Fn(&ScoredCandidate) -> bool,
    note: impl Fn(UsageKey) -> MatchNote,
) -> Vec<ScoredCandidate> {
    if !group.iter().any(&keep) {
        return group;
    }
    let (kept, dropped): (Vec<_>, Vec<_>) = group.into_iter().partition(|c| keep(c));
    notes.extend(dropped.iter().map(|c| note(c.key())));
    kept
}

/// Best score first, then better classification agreement, then lowest key.
fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .raw
            .total_cmp(&a.score.raw)
            .then_with(|| {
                b.score
                    .classification_score
                    .total_cmp(&a.score.classification_score)
            })
            .then_with(|| a.key().cmp(&b.key()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TaxonomicStatus;

    fn usage(key: u64, name: &str, rank: Rank) -> CandidateUsage {
        CandidateUsage::new(UsageKey(key), name, rank, TaxonomicStatus::Accepted)
    }

    fn make_test_index() -> CandidateIndex {
        CandidateIndex::build(vec![
            usage(1, "Abies", Rank::Genus).with_classification(
                Classification::new()
                    .with(HigherRank::Kingdom, "Plantae")
                    .with(HigherRank::Family, "Pinaceae"),
            ),
            usage(2, "Abies alba", Rank::Species)
                .with_authorship("Mill.")
                .with_classification(
                    Classification::new()
                        .with(HigherRank::Kingdom, "Plantae")
                        .with(HigherRank::Family, "Pinaceae")
                        .with(HigherRank::Genus, "Abies"),
                ),
            usage(10, "Oenanthe", Rank::Genus)
                .with_authorship("L.")
                .with_classification(
                    Classification::new()
                        .with(HigherRank::Kingdom, "Plantae")
                        .with(HigherRank::Family, "Apiaceae"),
                ),
            usage(11, "Oenanthe", Rank::Genus)
                .with_authorship("Vieillot")
                .with_classification(
                    Classification::new()
                        .with(HigherRank::Kingdom, "Animalia")
                        .with(HigherRank::Family, "Muscicapidae"),
                ),
            usage(20, "Puma concolor", Rank::Species).with_authorship("Linnaeus"),
            usage(21, "Puma concolor", Rank::Species).with_authorship("L."),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_match() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Abies alba Mill.")).unwrap();
        assert_eq!(result.match_type, MatchType::Exact);
        match result.outcome {
            MatchOutcome::Match(c) => {
                assert_eq!(c.key(), UsageKey(2));
                assert_eq!(c.score.author, Equality::Equal);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_no_candidates() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Quercus robur")).unwrap();
        assert!(matches!(
            result.outcome,
            MatchOutcome::NoMatch(NoMatchReason::NoCandidates)
        ));
        assert_eq!(result.match_type, MatchType::None);
    }

    #[test]
    fn test_parse_failure_is_no_match() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("incertae sedis")).unwrap();
        assert_eq!(result.outcome.label(), "parse_failed");
        assert!(matches!(result.notes[0], MatchNote::ParseFailed { .. }));
    }

    #[test]
    fn test_invalid_query_is_an_error() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Abies\u{7}alba"));
        assert!(matches!(result, Err(MatchError::InvalidQuery(_))));
    }

    #[test]
    fn test_homonyms_without_context_are_ambiguous() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Oenanthe")).unwrap();
        match result.outcome {
            MatchOutcome::Ambiguous(candidates) => {
                let keys: Vec<u64> = candidates.iter().map(|c| c.key().0).collect();
                assert_eq!(keys, vec![10, 11]);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_homonyms_resolved_by_classification() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let query = NameQuery::new("Oenanthe")
            .with_classification(Classification::new().with(HigherRank::Kingdom, "Animalia"));
        let result = engine.match_name(&query).unwrap();
        assert_eq!(result.outcome.selected().map(ScoredCandidate::key), Some(UsageKey(11)));
        assert!(result
            .notes
            .contains(&MatchNote::ClassificationConflict { key: UsageKey(10) }));
    }

    #[test]
    fn test_homonyms_resolved_by_author() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let query = NameQuery::new("Oenanthe").with_authorship("Vieill.");
        let result = engine.match_name(&query).unwrap();
        assert!(matches!(result.outcome, MatchOutcome::Match(ref c) if c.key() == UsageKey(11)));
    }

    #[test]
    fn test_identical_candidates_resolved_by_key() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Puma concolor")).unwrap();
        assert_eq!(result.outcome.selected().map(ScoredCandidate::key), Some(UsageKey(20)));
        assert!(result
            .notes
            .iter()
            .any(|n| matches!(n, MatchNote::TieBrokenByKey { .. })));
    }

    #[test]
    fn test_rank_mismatch_is_doubtful() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let query = NameQuery::new("Abies").with_rank(Rank::Species);
        let result = engine.match_name(&query).unwrap();
        match result.outcome {
            MatchOutcome::Doubtful(c) => assert!((c.confidence() - 71.0).abs() < 0.001),
            other => panic!("expected doubtful, got {other:?}"),
        }
    }

    #[test]
    fn test_low_confidence_is_no_match() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let query = NameQuery::new("Abies alba")
            .with_authorship("L.")
            .with_rank(Rank::Genus)
            .with_classification(Classification::new().with(HigherRank::Family, "Fabaceae"));
        let result = engine.match_name(&query).unwrap();
        assert!(matches!(
            result.outcome,
            MatchOutcome::NoMatch(NoMatchReason::LowConfidence)
        ));
    }

    #[test]
    fn test_fuzzy_match() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Abies alha")).unwrap();
        assert_eq!(result.match_type, MatchType::Fuzzy);
        assert_eq!(result.outcome.selected().map(ScoredCandidate::key), Some(UsageKey(2)));

        let mut config = MatchingConfig::default();
        config.fuzzy.enabled = false;
        let engine = MatchingEngine::with_config(&index, config);
        let result = engine.match_name(&NameQuery::new("Abies alha")).unwrap();
        assert_eq!(result.match_type, MatchType::Higher);
        assert_eq!(result.outcome.selected().map(ScoredCandidate::key), Some(UsageKey(1)));
    }

    #[test]
    fn test_single_case_names() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        for name in ["ABIES ALBA", "abies alba"] {
            let result = engine.match_name(&NameQuery::new(name)).unwrap();
            assert_eq!(result.match_type, MatchType::Exact, "{name}");
            assert_eq!(
                result.outcome.selected().map(ScoredCandidate::key),
                Some(UsageKey(2)),
                "{name}"
            );
            assert_eq!(result.notes[0], MatchNote::SingleCase);
        }

        // No fuzzy lookup for single case names
        let result = engine.match_name(&NameQuery::new("ABIES ALHA")).unwrap();
        assert!(!result
            .notes
            .iter()
            .any(|n| matches!(n, MatchNote::FuzzyLookup { .. })));
        assert!(result.outcome.selected().map_or(true, |c| c.key() != UsageKey(2)));
    }

    #[test]
    fn test_accepted_wins_over_synonym() {
        let classification = Classification::new()
            .with(HigherRank::Kingdom, "Plantae")
            .with(HigherRank::Family, "Pinaceae");
        let index = CandidateIndex::build(vec![
            CandidateUsage::new(UsageKey(3), "Abies alba", Rank::Species, TaxonomicStatus::Synonym)
                .with_classification(classification.clone()),
            usage(5, "Abies alba", Rank::Species).with_classification(classification),
        ])
        .unwrap();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Abies alba")).unwrap();
        match result.outcome {
            MatchOutcome::Match(c) => assert_eq!(c.key(), UsageKey(5)),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_species_matches_genus() {
        let index = make_test_index();
        let engine = MatchingEngine::new(&index);
        let result = engine.match_name(&NameQuery::new("Abies nonexistens")).unwrap();
        assert_eq!(result.match_type, MatchType::Higher);
        match result.outcome {
            MatchOutcome::Match(ref c) => assert_eq!(c.key(), UsageKey(1)),
            ref other => panic!("expected match, got {other:?}"),
        }
        assert!(result.notes.contains(&MatchNote::HigherRank {
            key: UsageKey(1),
            name: "Abies".to_string(),
            rank: Rank::Genus,
        }));
    }

    #[test]
    fn test_unknown_infraspecific_name_matches_species() {
        let index = make_test_index();
        let mut config = MatchingConfig::default();
        config.fuzzy.enabled = false;
        let engine = MatchingEngine::with_config(&index, config);
        let result = engine
            .match_name(&NameQuery::new("Abies alba subsp. nonexistens"))
            .unwrap();
        assert_eq!(result.match_type, MatchType::Higher);
        assert_eq!(result.outcome.selected().map(ScoredCandidate::key), Some(UsageKey(2)));
    }

    #[test]
    fn test_unknown_name_matches_classification() {
        let mut usages = vec![usage(30, "Pinaceae", Rank::Family)
            .with_classification(Classification::new().with(HigherRank::Kingdom, "Plantae"))];
        usages.push(usage(2, "Abies alba", Rank::Species));
        let index = CandidateIndex::build(usages).unwrap();
        let engine = MatchingEngine::new(&index);

        let query = NameQuery::new("Xus yus").with_classification(
            Classification::new()
                .with(HigherRank::Kingdom, "Plantae")
                .with(HigherRank::Family, "Pinaceae")
                .with(HigherRank::Genus, "Xus"),
        );
        let result = engine.match_name(&query).unwrap();
        assert_eq!(result.match_type, MatchType::Higher);
        assert_eq!(result.outcome.selected().map(ScoredCandidate::key), Some(UsageKey(30)));

        let mut config = MatchingConfig::default();
        config.higher_ranks = false;
        let engine = MatchingEngine::with_config(&index, config);
        let result = engine.match_name(&query).unwrap();
        assert!(matches!(
            result.outcome,
            MatchOutcome::NoMatch(NoMatchReason::NoCandidates)
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config = MatchingConfig::from_json(r#"{"strict_threshold": 90}"#).unwrap();
        assert!((config.strict_threshold - 90.0).abs() < 0.001);
        assert!((config.doubtful_threshold - 50.0).abs() < 0.001);
        assert!(config.fuzzy.enabled);

        assert!(matches!(
            MatchingConfig::from_json(r#"{"strict": 90}"#),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            MatchingConfig::from_json(r#"{"strict_threshold": 40}"#),
            Err(ConfigError::Invalid(_))
        ));

        let config =
            MatchingConfig::from_json(r#"{"scoring": {"author_equal_bonus": -3}}"#).unwrap();
        assert!(config.scoring.author_equal_bonus.abs() < 0.001);
    }
}
