//! Name matching engine and scoring.
//!
//! - [`engine::MatchingEngine`]: matches one name against the candidate index
//! - [`scoring::MatchScore`]: the confidence components of one candidate
//! - [`diagnosis::MatchNote`]: why a decision was taken
//! - [`dataset::DatasetMatcher`]: matches whole datasets with failure isolation
//!
//! ## Matching Algorithm
//!
//! 1. **Parse**: the name is split into its parts; unparsable names end as `NoMatch`
//! 2. **Lookup**: candidates sharing the normalized canonical name, or the top similar names
//!    when there are none
//! 3. **Score**: name similarity adjusted by author, rank and classification agreement
//! 4. **Filter**: candidates with conflicting authors or classification are dropped while a
//!    better one remains
//! 5. **Decide**: `Match`, `Doubtful`, `Ambiguous` or `NoMatch` by thresholds and ties
//!
//! ## Example
//!
//! ```rust
//! use nub_matcher::catalog::store::CandidateIndex;
//! use nub_matcher::core::types::{Rank, TaxonomicStatus, UsageKey};
//! use nub_matcher::core::usage::CandidateUsage;
//! use nub_matcher::matching::engine::{MatchOutcome, MatchingEngine, NameQuery};
//!
//! let index = CandidateIndex::build(vec![CandidateUsage::new(
//!     UsageKey(1),
//!     "Abies alba",
//!     Rank::Species,
//!     TaxonomicStatus::Accepted,
//! )])
//! .unwrap();
//!
//! let engine = MatchingEngine::new(&index);
//! let result = engine.match_name(&NameQuery::new("Abies alba Mill.")).unwrap();
//! assert!(matches!(result.outcome, MatchOutcome::Match(_)));
//! ```

pub mod authorship;
pub mod classification;
pub mod dataset;
pub mod diagnosis;
pub mod engine;
pub mod scoring;
