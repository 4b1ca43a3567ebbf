//! # nub-matcher
//!
//! A library for matching scientific names from taxonomic checklists against a single
//! canonical backbone taxonomy.
//!
//! Checklists spell the same taxon in many ways: with or without authorship, with abbreviated
//! authors, with diacritics, misspelled epithets or a different gender ending. Different taxa
//! also share names (homonyms) and can only be told apart by their authors or their place in
//! the classification.
//!
//! `nub-matcher` normalizes names, looks them up in an index of backbone usages, scores the
//! candidates and decides on a match, a doubtful match, an ambiguous set or no match.
//!
//! ## Features
//!
//! - **Normalization**: Diacritics, hybrid markers, punctuation and common misspellings
//! - **Fuzzy lookup**: Similar names when the exact name is unknown
//! - **Author comparison**: Abbreviations, teams, filius and year tolerance
//! - **Classification**: Homonyms separated by kingdom to subgenus
//! - **Datasets**: Whole checklists matched with per record failure isolation
//! - **Hot reload**: A changed backbone swapped in without stopping readers
//!
//! ## Example
//!
//! ```rust
//! use nub_matcher::{CandidateIndex, CandidateUsage, MatchingEngine, NameQuery};
//! use nub_matcher::core::types::{Rank, TaxonomicStatus, UsageKey};
//!
//! let index = CandidateIndex::build(vec![
//!     CandidateUsage::new(UsageKey(1), "Abies alba", Rank::Species, TaxonomicStatus::Accepted)
//!         .with_authorship("Mill."),
//! ])
//! .unwrap();
//!
//! let engine = MatchingEngine::new(&index);
//! let result = engine.match_name(&NameQuery::new("Abies alba Miller")).unwrap();
//! let selected = result.outcome.selected().unwrap();
//! println!("{} ({:.0})", selected.usage.canonical_name, selected.confidence());
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Candidate index, snapshots and hot swapping
//! - [`core`]: Core data types for names, usages and classifications
//! - [`similarity`]: String similarity metrics
//! - [`matching`]: Matching engine, scoring and dataset matching
//! - [`parsing`]: Name parser and TSV readers
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP matching service

pub mod catalog;
pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod similarity;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use catalog::handle::IndexHandle;
pub use catalog::store::CandidateIndex;
pub use core::name::ParsedName;
pub use core::usage::CandidateUsage;
pub use matching::engine::{MatchOutcome, MatchResult, MatchingConfig, MatchingEngine, NameQuery};
