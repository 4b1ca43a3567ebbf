//! Core data types for scientific name matching.
//!
//! - [`ParsedName`]: a scientific name split into genus, epithets and authorship
//! - [`CandidateUsage`]: a backbone usage stored in the candidate index
//! - [`Classification`]: higher taxa (kingdom to subgenus) describing a name's context
//! - [`UsageKey`], [`SourceId`], [`DatasetKey`]: identifiers
//! - [`Rank`], [`TaxonomicStatus`], [`Equality`], [`MatchType`]: classification of names and results
//!
//! The [`normalize`] module produces the comparison forms every other component works on.
//!
//! [`ParsedName`]: name::ParsedName
//! [`CandidateUsage`]: usage::CandidateUsage
//! [`Classification`]: classification::Classification
//! [`UsageKey`]: types::UsageKey
//! [`SourceId`]: types::SourceId
//! [`DatasetKey`]: types::DatasetKey
//! [`Rank`]: types::Rank
//! [`TaxonomicStatus`]: types::TaxonomicStatus
//! [`Equality`]: types::Equality
//! [`MatchType`]: types::MatchType

pub mod classification;
pub mod name;
pub mod normalize;
pub mod types;
pub mod usage;
