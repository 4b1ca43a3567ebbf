//! Readers for names and tabular input.
//!
//! - **Scientific names**: [`name::parse`] splits a name into genus, epithets, rank and
//!   authorship
//! - **Backbone snapshots**: [`tsv::parse_backbone_tsv`] reads one usage per row
//! - **Dataset records**: [`tsv::TsvRecordProvider`] streams source records, one dataset per file
//! - **Relations**: [`tsv::TsvRelationSink`] writes matched relations
//!
//! ## Example
//!
//! ```rust
//! use nub_matcher::core::types::Rank;
//! use nub_matcher::parsing::name::parse;
//!
//! let name = parse("Abies alba subsp. apennina Mill. 1768").unwrap();
//! assert_eq!(name.genus.as_deref(), Some("Abies"));
//! assert_eq!(name.rank, Some(Rank::Subspecies));
//! assert_eq!(name.year.as_deref(), Some("1768"));
//! ```
//!
//! ## Backbone columns
//!
//! | Column | Description | Required |
//! |--------|-------------|----------|
//! | key | Usage key | Yes |
//! | canonical_name | Name without authorship | Yes |
//! | rank | Rank, e.g. `species` | Yes |
//! | status | `accepted`, `doubtful` or `synonym` | No |
//! | authorship, year | Combination authorship | No |
//! | bracket_authorship, bracket_year | Basionym authorship | No |
//! | kingdom ... subgenus | Higher classification | No |
//! | accepted_key | Accepted usage of a synonym | No |

pub mod name;
pub mod tsv;
