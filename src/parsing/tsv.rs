//! Tab separated files: backbone usages, dataset source records and relations.
//!
//! Backbone and record files start with a header line naming their columns; column order is
//! free and unknown columns are ignored. Lines starting with `#` and blank lines are skipped.
//! Files ending in `.gz` or `.bgz` are decompressed on the fly.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use parking_lot::Mutex;

use crate::catalog::store::CatalogError;
use crate::core::classification::{Classification, HigherRank};
use crate::core::types::{DatasetKey, Rank, TaxonomicStatus, UsageKey};
use crate::core::usage::CandidateUsage;
use crate::matching::dataset::{
    CollaboratorError, RecordError, RecordIter, Relation, RelationSink, SourceRecord,
    SourceRecordProvider,
};
use crate::utils::validation::{check_record_limit, non_empty};

/// Header of relation files written by [`TsvRelationSink`]
pub const RELATION_HEADER: &str = "dataset_key\tsource_id\tusage_key\tdoubtful\tconfidence";

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
#[must_use]
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Open a file for buffered reading, decompressing gzip files.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened.
pub fn open_reader(path: &Path) -> std::io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Column positions taken from a header line
#[derive(Debug, Clone)]
struct Columns {
    positions: HashMap<String, usize>,
}

impl Columns {
    fn from_header(line: &str) -> Self {
        let positions = line
            .split('\t')
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();
        Self { positions }
    }

    fn has(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Trimmed, non-empty value of a column
    fn get<'l>(&self, fields: &[&'l str], name: &str) -> Option<&'l str> {
        let value = fields.get(*self.positions.get(name)?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    fn classification(&self, fields: &[&str]) -> Classification {
        let mut classification = Classification::new();
        for rank in HigherRank::ALL {
            classification.set(rank, non_empty(self.get(fields, rank.as_str())));
        }
        classification
    }
}

/// Data lines of a TSV file with their 1-based line numbers, header first
fn data_lines<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| {
            line.as_ref()
                .map_or(true, |l| !l.trim().is_empty() && !l.starts_with('#'))
        })
}

/// Parse backbone usages.
///
/// Required columns: `key`, `canonical_name`, `rank`. Optional: `status` (default accepted),
/// `authorship`, `year`, `bracket_authorship`, `bracket_year`, `kingdom` to `subgenus`,
/// `accepted_key`.
///
/// # Errors
///
/// Returns `CatalogError::InvalidRow` for a missing header column or an invalid value,
/// `CatalogError::TooManyRows` above the record limit and `CatalogError::ReadError` on I/O errors.
pub fn parse_backbone_tsv<R: BufRead>(reader: R) -> Result<Vec<CandidateUsage>, CatalogError> {
    let mut lines = data_lines(reader);
    let Some((header_line, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns = Columns::from_header(&header?);
    for required in ["key", "canonical_name", "rank"] {
        if !columns.has(required) {
            return Err(CatalogError::InvalidRow {
                line: header_line,
                message: format!("missing column '{required}'"),
            });
        }
    }

    let mut usages = Vec::new();
    for (line_num, line) in lines {
        let line = line?;
        if let Some(msg) = check_record_limit(usages.len()) {
            return Err(CatalogError::TooManyRows(msg));
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let invalid = |message: String| CatalogError::InvalidRow {
            line: line_num,
            message,
        };

        let key: UsageKey = columns
            .get(&fields, "key")
            .ok_or_else(|| invalid("missing key".to_string()))?
            .parse()
            .map_err(|e| invalid(format!("invalid key: {e}")))?;
        let name = columns
            .get(&fields, "canonical_name")
            .ok_or_else(|| invalid("missing canonical name".to_string()))?;
        let rank: Rank = columns
            .get(&fields, "rank")
            .unwrap_or_default()
            .parse()
            .map_err(|e: crate::core::types::UnknownRank| invalid(e.to_string()))?;
        let status = match columns.get(&fields, "status") {
            Some(s) => s.parse::<TaxonomicStatus>().map_err(invalid)?,
            None => TaxonomicStatus::Accepted,
        };

        let mut usage = CandidateUsage::new(key, name, rank, status)
            .with_classification(columns.classification(&fields));
        usage.authorship = non_empty(columns.get(&fields, "authorship"));
        usage.year = non_empty(columns.get(&fields, "year"));
        usage.bracket_authorship = non_empty(columns.get(&fields, "bracket_authorship"));
        usage.bracket_year = non_empty(columns.get(&fields, "bracket_year"));
        if let Some(accepted) = columns.get(&fields, "accepted_key") {
            usage.accepted_key = Some(
                accepted
                    .parse()
                    .map_err(|e| invalid(format!("invalid accepted key: {e}")))?,
            );
        }
        usages.push(usage);
    }
    Ok(usages)
}

/// Parse source records lazily.
///
/// Required columns: `id`, `scientific_name`. Optional: `authorship`, `rank`, `kingdom` to
/// `subgenus`. A broken row becomes a `RecordError` for that row only.
///
/// # Errors
///
/// Returns `CollaboratorError` if the header cannot be read or lacks a required column.
pub fn parse_records_tsv<'a, R: BufRead + 'a>(
    reader: R,
) -> Result<RecordIter<'a>, CollaboratorError> {
    let mut lines = data_lines(reader);
    let Some((_, header)) = lines.next() else {
        return Ok(Box::new(std::iter::empty()));
    };
    let columns = Columns::from_header(&header?);
    for required in ["id", "scientific_name"] {
        if !columns.has(required) {
            return Err(CollaboratorError::Unavailable(format!(
                "record file lacks column '{required}'"
            )));
        }
    }
    Ok(Box::new(lines.map(move |(line_num, line)| {
        let line = line.map_err(|e| RecordError::ReadError(e.to_string()))?;
        parse_record(&columns, &line, line_num)
    })))
}

fn parse_record(columns: &Columns, line: &str, line_num: usize) -> Result<SourceRecord, RecordError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let invalid = |message: &str| RecordError::InvalidRow {
        line: line_num,
        message: message.to_string(),
    };
    let id = columns.get(&fields, "id").ok_or_else(|| invalid("missing id"))?;
    let name = columns
        .get(&fields, "scientific_name")
        .ok_or_else(|| invalid("missing scientific name"))?;

    let mut record = SourceRecord::new(id, name)
        .with_classification(columns.classification(&fields));
    record.authorship = non_empty(columns.get(&fields, "authorship"));
    if let Some(rank) = columns.get(&fields, "rank") {
        record.rank = Some(rank.parse().map_err(|_| invalid(&format!("unknown rank '{rank}'")))?);
    }
    Ok(record)
}

/// Source records read from one TSV file per dataset
#[derive(Debug, Default)]
pub struct TsvRecordProvider {
    files: HashMap<DatasetKey, PathBuf>,
}

impl TsvRecordProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, dataset: DatasetKey, path: impl Into<PathBuf>) -> Self {
        self.files.insert(dataset, path.into());
        self
    }
}

impl SourceRecordProvider for TsvRecordProvider {
    fn records(&self, dataset: &DatasetKey) -> Result<RecordIter<'_>, CollaboratorError> {
        let path = self
            .files
            .get(dataset)
            .ok_or_else(|| CollaboratorError::UnknownDataset(dataset.clone()))?;
        parse_records_tsv(open_reader(path)?)
    }
}

/// Writes relations of all datasets to one TSV file
#[derive(Debug)]
pub struct TsvRelationSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TsvRelationSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl RelationSink for TsvRelationSink {
    fn delete_relations(&self, dataset: &DatasetKey) -> Result<(), CollaboratorError> {
        let _guard = self.lock.lock();
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let prefix = format!("{dataset}\t");
        let mut out = String::from(RELATION_HEADER);
        out.push('\n');
        for line in existing.lines().skip(1) {
            if !line.starts_with(&prefix) {
                out.push_str(line);
                out.push('\n');
            }
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }

    fn insert_relations(
        &self,
        dataset: &DatasetKey,
        relations: &[Relation],
    ) -> Result<(), CollaboratorError> {
        let _guard = self.lock.lock();
        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if is_new {
            writeln!(file, "{RELATION_HEADER}")?;
        }
        for r in relations {
            writeln!(
                file,
                "{}\t{}\t{}\t{}\t{:.1}",
                dataset, r.source_id, r.usage_key, r.doubtful, r.confidence
            )?;
        }
        Ok(())
    }
}
