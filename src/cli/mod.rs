//! Command-line interface for nub-matcher.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **match**: Match a single scientific name against the backbone
//! - **dataset**: Match every record of a dataset file and write relations
//! - **compare**: Compare two names with a similarity metric, or two authorships
//! - **index**: Inspect or export a backbone snapshot
//! - **serve**: Start the HTTP matching service
//!
//! ## Usage
//!
//! ```text
//! # Match one name
//! nub-matcher match "Abies alba Mill." --backbone backbone.tsv.gz
//!
//! # Add context to separate homonyms
//! nub-matcher match Oenanthe --kingdom Animalia --backbone backbone.tsv.gz --format json
//!
//! # Match a dataset and write relations
//! nub-matcher dataset records.tsv --backbone backbone.tsv.gz --output relations.tsv
//!
//! # Score two names
//! nub-matcher compare "Abies alba" "Abies alta" --metric jaro-winkler
//!
//! # Start the service
//! nub-matcher serve --backbone backbone.json --port 8080
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::catalog::snapshot::SnapshotFile;
use crate::catalog::store::CandidateIndex;
use crate::core::classification::{Classification, HigherRank};
use crate::matching::authorship::AuthorComparator;
use crate::matching::engine::MatchingConfig;

pub mod compare;
pub mod dataset;
pub mod index;
pub mod name;

#[derive(Parser)]
#[command(name = "nub-matcher")]
#[command(version)]
#[command(about = "Match scientific names against a taxonomic backbone")]
#[command(
    long_about = "nub-matcher links scientific names from checklists to the usages of a taxonomic backbone.\n\nNames are matched by their normalized canonical form, falling back to similar names, and candidates are separated by authorship, rank and higher classification. Every name ends as a match, a doubtful match, an ambiguous set of candidates or no match."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match a single scientific name
    Match(name::MatchArgs),

    /// Match all records of a dataset
    Dataset(dataset::DatasetArgs),

    /// Compare two names or authorships
    Compare(compare::CompareArgs),

    /// Inspect a backbone snapshot
    Index(index::IndexArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub backbone: BackboneArgs,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,
}

/// Backbone and matching configuration shared by the matching commands
#[derive(clap::Args, Clone, Debug)]
pub struct BackboneArgs {
    /// Backbone snapshot (JSON or TSV, optionally gzipped)
    #[arg(short, long)]
    pub backbone: PathBuf,

    /// Matching configuration (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Author abbreviations (TSV: abbreviation, full name)
    #[arg(long)]
    pub author_map: Option<PathBuf>,
}

impl BackboneArgs {
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub fn load_index(&self) -> anyhow::Result<CandidateIndex> {
        let snapshot = SnapshotFile::new(&self.backbone)?;
        snapshot
            .load_index()
            .with_context(|| format!("Failed to load backbone {}", self.backbone.display()))
    }

    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid.
    pub fn load_config(&self) -> anyhow::Result<MatchingConfig> {
        match &self.config {
            Some(path) => MatchingConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            None => Ok(MatchingConfig::default()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the author map is unreadable or malformed.
    pub fn load_authors(&self) -> anyhow::Result<AuthorComparator> {
        match &self.author_map {
            Some(path) => AuthorComparator::load_author_map(path)
                .with_context(|| format!("Failed to load author map {}", path.display())),
            None => Ok(AuthorComparator::new()),
        }
    }
}

/// Higher classification given on the command line
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ClassificationArgs {
    #[arg(long)]
    pub kingdom: Option<String>,

    #[arg(long)]
    pub phylum: Option<String>,

    #[arg(long)]
    pub class: Option<String>,

    #[arg(long)]
    pub order: Option<String>,

    #[arg(long)]
    pub family: Option<String>,

    #[arg(long)]
    pub genus: Option<String>,

    #[arg(long)]
    pub subgenus: Option<String>,
}

impl ClassificationArgs {
    #[must_use]
    pub fn to_classification(&self) -> Classification {
        let mut classification = Classification::new();
        let values = [
            (HigherRank::Kingdom, &self.kingdom),
            (HigherRank::Phylum, &self.phylum),
            (HigherRank::Class, &self.class),
            (HigherRank::Order, &self.order),
            (HigherRank::Family, &self.family),
            (HigherRank::Genus, &self.genus),
            (HigherRank::Subgenus, &self.subgenus),
        ];
        for (rank, value) in values {
            classification.set(rank, crate::utils::validation::non_empty(value.as_deref()));
        }
        classification
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
