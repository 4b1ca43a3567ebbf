//! Matching whole datasets against the backbone.
//!
//! A [`DatasetMatcher`] reads the records of one dataset from a [`SourceRecordProvider`],
//! matches every record against a single pinned index snapshot and replaces the dataset's
//! relations in a [`RelationSink`]. Record level failures are counted and logged, never fatal.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::handle::IndexHandle;
use crate::core::classification::Classification;
use crate::core::types::{DatasetKey, Rank, SourceId, UsageKey};
use crate::matching::authorship::AuthorComparator;
use crate::matching::engine::{
    MatchError, MatchOutcome, MatchingConfig, MatchingEngine, NameQuery, NoMatchReason,
};
use crate::utils::validation::{check_record_limit, validate_dataset_key, ValidationError};

/// Below this share of matched records a warning is logged
const LOW_MATCH_RATE_PERCENT: usize = 25;

/// One name of a source dataset waiting to be matched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    pub source_id: SourceId,
    pub scientific_name: String,
    pub authorship: Option<String>,
    pub rank: Option<Rank>,
    pub classification: Classification,
}

impl SourceRecord {
    pub fn new(source_id: impl Into<String>, scientific_name: impl Into<String>) -> Self {
        Self {
            source_id: SourceId::new(source_id),
            scientific_name: scientific_name.into(),
            authorship: None,
            rank: None,
            classification: Classification::new(),
        }
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

    #[must_use]
    pub fn to_query(&self) -> NameQuery {
        NameQuery {
            scientific_name: self.scientific_name.clone(),
            authorship: self.authorship.clone(),
            rank: self.rank,
            classification: self.classification.clone(),
        }
    }
}

/// A source record linked to a backbone usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    pub source_id: SourceId,
    pub usage_key: UsageKey,
    /// Selected below the strict threshold
    pub doubtful: bool,
    pub confidence: f64,
}

/// Failure of a single record; counted and skipped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] ValidationError),

    #[error("Failed to read record: {0}")]
    ReadError(String),
}

/// Failure of a collaborator (record provider or relation sink)
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(DatasetKey),

    #[error("{0}")]
    Unavailable(String),
}

/// Records of one dataset in source order
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<SourceRecord, RecordError>> + 'a>;

/// Supplies the records of a dataset
pub trait SourceRecordProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `CollaboratorError` if the dataset cannot be read at all.
    fn records(&self, dataset: &DatasetKey) -> Result<RecordIter<'_>, CollaboratorError>;
}

/// Persists relations. Relations of a dataset are always replaced, never merged.
pub trait RelationSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `CollaboratorError` if the sink is unreachable.
    fn delete_relations(&self, dataset: &DatasetKey) -> Result<(), CollaboratorError>;

    /// # Errors
    ///
    /// Returns `CollaboratorError` if the sink is unreachable.
    fn insert_relations(
        &self,
        dataset: &DatasetKey,
        relations: &[Relation],
    ) -> Result<(), CollaboratorError>;
}

#[derive(Error, Debug)]
pub enum DatasetMatchError {
    #[error("Candidate index not available")]
    IndexUnavailable,

    #[error("Invalid dataset key: {0}")]
    InvalidDataset(#[from] ValidationError),

    #[error("Failed to read source records: {0}")]
    Source(CollaboratorError),

    #[error("Failed to write relations: {0}")]
    Sink(CollaboratorError),

    #[error("{0}")]
    TooManyRecords(String),

    #[error("Dataset {} produced no relations", .summary.dataset_key)]
    EmptyResult { summary: Box<DatasetMatchSummary> },

    #[error("Matching dataset {} was cancelled", .summary.dataset_key)]
    Cancelled { summary: Box<DatasetMatchSummary> },

    #[error("Matching dataset {} timed out", .summary.dataset_key)]
    TimedOut { summary: Box<DatasetMatchSummary> },
}

impl DatasetMatchError {
    /// Counts collected before the failure, if any
    #[must_use]
    pub fn summary(&self) -> Option<&DatasetMatchSummary> {
        match self {
            Self::EmptyResult { summary }
            | Self::Cancelled { summary }
            | Self::TimedOut { summary } => Some(summary),
            _ => None,
        }
    }
}

/// Outcome counts of one dataset run
#[derive(Debug, Clone, Serialize)]
pub struct DatasetMatchSummary {
    pub dataset_key: DatasetKey,
    pub total: usize,
    pub matched: usize,
    pub doubtful: usize,
    pub ambiguous: usize,
    pub no_match: usize,
    pub parse_failed: usize,
    pub failed_records: usize,
    pub usages_by_rank: BTreeMap<Rank, usize>,
    pub matches_by_rank: BTreeMap<Rank, usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
}

impl DatasetMatchSummary {
    #[must_use]
    pub fn new(dataset_key: DatasetKey) -> Self {
        Self {
            dataset_key,
            total: 0,
            matched: 0,
            doubtful: 0,
            ambiguous: 0,
            no_match: 0,
            parse_failed: 0,
            failed_records: 0,
            usages_by_rank: BTreeMap::new(),
            matches_by_rank: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            elapsed_ms: 0,
        }
    }

    /// Records that produced a relation
    #[must_use]
    pub fn relations(&self) -> usize {
        self.matched + self.doubtful
    }

    /// Percentage of all records that produced a relation, 100 for an empty dataset
    #[must_use]
    pub fn perc_matched(&self) -> usize {
        percent(self.relations(), self.total)
    }

    /// Percentage of records at genus rank or below that produced a relation
    #[must_use]
    pub fn perc_backbone_relevant_no_matches(&self) -> usize {
        let relevant = |rank: &&Rank| **rank == Rank::Genus || rank.is_species_or_below();
        let total: usize = self
            .usages_by_rank
            .iter()
            .filter(|(r, _)| relevant(r))
            .map(|(_, c)| c)
            .sum();
        let matched: usize = self
            .matches_by_rank
            .iter()
            .filter(|(r, _)| relevant(r))
            .map(|(_, c)| c)
            .sum();
        percent(matched, total)
    }

    fn add_outcome(&mut self, rank: Rank, outcome: &MatchOutcome) {
        self.total += 1;
        *self.usages_by_rank.entry(rank).or_default() += 1;
        match outcome {
            MatchOutcome::Match(_) => self.matched += 1,
            MatchOutcome::Doubtful(_) => self.doubtful += 1,
            MatchOutcome::Ambiguous(_) => self.ambiguous += 1,
            MatchOutcome::NoMatch(NoMatchReason::ParseFailed) => self.parse_failed += 1,
            MatchOutcome::NoMatch(_) => self.no_match += 1,
        }
        if outcome.selected().is_some() {
            *self.matches_by_rank.entry(rank).or_default() += 1;
        }
    }

    fn add_failure(&mut self) {
        self.total += 1;
        self.failed_records += 1;
    }

    fn finish(&mut self, started: Instant) {
        self.finished_at = Some(Utc::now());
        self.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    }
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        part * 100 / total
    }
}

impl std::fmt::Display for DatasetMatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Dataset {}: total={}, matched={}, doubtful={}, ambiguous={}, no_match={}, \
             parse_failed={}, failed={}, perc={}, perc_lower={}, elapsed={}ms",
            self.dataset_key,
            self.total,
            self.matched,
            self.doubtful,
            self.ambiguous,
            self.no_match,
            self.parse_failed,
            self.failed_records,
            self.perc_matched(),
            self.perc_backbone_relevant_no_matches(),
            self.elapsed_ms
        )?;
        for (rank, count) in &self.usages_by_rank {
            let matched = self.matches_by_rank.get(rank).copied().unwrap_or(0);
            writeln!(f, "  {rank}: {matched}/{count}")?;
        }
        Ok(())
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    TimedOut,
}

/// Cooperative cancellation and deadline, checked between records
#[derive(Debug, Clone, Default)]
pub struct MatchControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MatchControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Stop all runs sharing this control before their next record
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn check(&self) -> Option<Interruption> {
        if self.is_cancelled() {
            Some(Interruption::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Interruption::TimedOut)
        } else {
            None
        }
    }
}

/// Matches datasets from a provider into a sink
pub struct DatasetMatcher<P, S> {
    handle: IndexHandle,
    provider: P,
    sink: S,
    config: MatchingConfig,
    authors: AuthorComparator,
}

impl<P: SourceRecordProvider, S: RelationSink> DatasetMatcher<P, S> {
    pub fn new(handle: IndexHandle, provider: P, sink: S) -> Self {
        Self {
            handle,
            provider,
            sink,
            config: MatchingConfig::default(),
            authors: AuthorComparator::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: MatchingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_authors(mut self, authors: AuthorComparator) -> Self {
        self.authors = authors;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Match every record of a dataset and replace its relations.
    ///
    /// The index snapshot current at the start is used for the whole run, so a concurrent
    /// reload never mixes two backbones within one dataset. Relations are only written after
    /// the last record, so a cancelled or timed out run leaves the previous relations intact.
    ///
    /// # Errors
    ///
    /// Structural failures (`IndexUnavailable`, `Source`, `Sink`) abort the run. `EmptyResult`,
    /// `Cancelled` and `TimedOut` carry the counts collected so far.
    pub fn match_dataset(
        &self,
        dataset: &DatasetKey,
        control: &MatchControl,
    ) -> Result<DatasetMatchSummary, DatasetMatchError> {
        validate_dataset_key(&dataset.0)?;
        let index = self
            .handle
            .current()
            .map_err(|_| DatasetMatchError::IndexUnavailable)?;
        let engine = MatchingEngine::with_config(&index, self.config.clone())
            .with_authors(self.authors.clone());

        info!("Matching dataset {} against {} backbone usages", dataset, index.len());
        let started = Instant::now();
        let mut summary = DatasetMatchSummary::new(dataset.clone());
        let mut relations = Vec::new();

        let records = self
            .provider
            .records(dataset)
            .map_err(DatasetMatchError::Source)?;

        for record in records {
            if let Some(interruption) = control.check() {
                summary.finish(started);
                let summary = Box::new(summary);
                return Err(match interruption {
                    Interruption::Cancelled => {
                        warn!("Matching dataset {dataset} cancelled after {} records", summary.total);
                        DatasetMatchError::Cancelled { summary }
                    }
                    Interruption::TimedOut => {
                        warn!("Matching dataset {dataset} timed out after {} records", summary.total);
                        DatasetMatchError::TimedOut { summary }
                    }
                });
            }
            if let Some(msg) = check_record_limit(summary.total) {
                return Err(DatasetMatchError::TooManyRecords(msg));
            }

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping record in dataset {dataset}: {e}");
                    summary.add_failure();
                    continue;
                }
            };

            let result = match engine.match_name(&record.to_query()) {
                Ok(result) => result,
                Err(MatchError::InvalidQuery(e)) => {
                    warn!("Failed to match record {}: {}", record.source_id, RecordError::from(e));
                    summary.add_failure();
                    continue;
                }
                Err(MatchError::IndexUnavailable) => {
                    return Err(DatasetMatchError::IndexUnavailable);
                }
            };

            let selected = result.outcome.selected();
            let rank = record
                .rank
                .or(selected.map(|c| c.usage.rank))
                .unwrap_or(Rank::Unranked);
            summary.add_outcome(rank, &result.outcome);
            if let Some(candidate) = selected {
                relations.push(Relation {
                    source_id: record.source_id.clone(),
                    usage_key: candidate.key(),
                    doubtful: matches!(result.outcome, MatchOutcome::Doubtful(_)),
                    confidence: candidate.confidence(),
                });
            }
        }
        summary.finish(started);

        if relations.is_empty() {
            warn!("Dataset {dataset} produced no relations from {} records", summary.total);
            return Err(DatasetMatchError::EmptyResult {
                summary: Box::new(summary),
            });
        }
        if summary.perc_matched() < LOW_MATCH_RATE_PERCENT {
            warn!(
                "Only {}% of all names and {}% of genera and below in dataset {} were matching",
                summary.perc_matched(),
                summary.perc_backbone_relevant_no_matches(),
                dataset
            );
        }

        self.sink
            .delete_relations(dataset)
            .map_err(DatasetMatchError::Sink)?;
        self.sink
            .insert_relations(dataset, &relations)
            .map_err(DatasetMatchError::Sink)?;

        info!("{summary}");
        Ok(summary)
    }

    /// Match several datasets in parallel, one result per dataset in input order
    pub fn match_datasets(
        &self,
        datasets: &[DatasetKey],
        control: &MatchControl,
    ) -> Vec<(DatasetKey, Result<DatasetMatchSummary, DatasetMatchError>)> {
        datasets
            .par_iter()
            .map(|d| (d.clone(), self.match_dataset(d, control)))
            .collect()
    }
}

/// Records kept in memory, keyed by dataset
#[derive(Debug, Default)]
pub struct MemoryRecordProvider {
    datasets: HashMap<DatasetKey, Vec<Result<SourceRecord, RecordError>>>,
}

impl MemoryRecordProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dataset(
        mut self,
        dataset: DatasetKey,
        records: Vec<Result<SourceRecord, RecordError>>,
    ) -> Self {
        self.datasets.insert(dataset, records);
        self
    }
}

impl SourceRecordProvider for MemoryRecordProvider {
    fn records(&self, dataset: &DatasetKey) -> Result<RecordIter<'_>, CollaboratorError> {
        let records = self
            .datasets
            .get(dataset)
            .ok_or_else(|| CollaboratorError::UnknownDataset(dataset.clone()))?;
        Ok(Box::new(records.iter().cloned()))
    }
}

/// Relations kept in memory, keyed by dataset
#[derive(Debug, Default)]
pub struct MemoryRelationSink {
    relations: Mutex<HashMap<DatasetKey, Vec<Relation>>>,
}

impl MemoryRelationSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn relations(&self, dataset: &DatasetKey) -> Vec<Relation> {
        self.relations.lock().get(dataset).cloned().unwrap_or_default()
    }

    /// Store relations as if written by an earlier run
    pub fn seed(&self, dataset: DatasetKey, relations: Vec<Relation>) {
        self.relations.lock().insert(dataset, relations);
    }
}

impl RelationSink for MemoryRelationSink {
    fn delete_relations(&self, dataset: &DatasetKey) -> Result<(), CollaboratorError> {
        self.relations.lock().remove(dataset);
        Ok(())
    }

    fn insert_relations(
        &self,
        dataset: &DatasetKey,
        relations: &[Relation],
    ) -> Result<(), CollaboratorError> {
        self.relations
            .lock()
            .entry(dataset.clone())
            .or_default()
            .extend_from_slice(relations);
        Ok(())
    }
}
