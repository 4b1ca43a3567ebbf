use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::catalog::handle::IndexHandle;
use crate::cli::{BackboneArgs, OutputFormat};
use crate::core::types::DatasetKey;
use crate::matching::dataset::{
    DatasetMatchError, DatasetMatchSummary, DatasetMatcher, MatchControl, MemoryRelationSink,
};
use crate::parsing::tsv::{TsvRecordProvider, TsvRelationSink, RELATION_HEADER};

#[derive(Args)]
pub struct DatasetArgs {
    /// Source records (TSV with id and scientific_name columns, optionally gzipped)
    #[arg(required = true)]
    pub records: PathBuf,

    #[command(flatten)]
    pub backbone: BackboneArgs,

    /// Dataset key; defaults to the file name
    #[arg(long)]
    pub dataset_key: Option<String>,

    /// Relations output file; relations of this dataset already in it are replaced.
    /// Without it, `--format tsv` prints the relations instead of the summary.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Abandon the run after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Execute dataset subcommand
///
/// # Errors
///
/// Returns an error if loading fails, the run is structurally broken, cancelled, timed out
/// or produced no relations.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DatasetArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let index = args.backbone.load_index()?;
    let config = args.backbone.load_config()?;
    let authors = args.backbone.load_authors()?;

    let dataset = DatasetKey::new(args.dataset_key.clone().unwrap_or_else(|| {
        args.records
            .file_name()
            .map_or_else(|| "dataset".to_string(), |n| n.to_string_lossy().to_string())
    }));

    if verbose {
        eprintln!(
            "Matching {} against {} backbone usages",
            args.records.display(),
            index.len()
        );
    }

    let handle = IndexHandle::from_index(index);
    let provider = TsvRecordProvider::new().with_file(dataset.clone(), &args.records);
    let mut control = MatchControl::new();
    if let Some(secs) = args.timeout_secs {
        control = control.with_timeout(Duration::from_secs(secs));
    }

    let result = match &args.output {
        Some(path) => {
            let matcher = DatasetMatcher::new(handle, provider, TsvRelationSink::new(path))
                .with_config(config)
                .with_authors(authors);
            matcher.match_dataset(&dataset, &control)
        }
        None => {
            let matcher = DatasetMatcher::new(handle, provider, MemoryRelationSink::new())
                .with_config(config)
                .with_authors(authors);
            let result = matcher.match_dataset(&dataset, &control);
            if result.is_ok() && matches!(format, OutputFormat::Tsv) {
                print_relations(matcher.sink(), &dataset);
                return Ok(());
            }
            result
        }
    };

    match result {
        Ok(summary) => print_summary(&summary, format),
        Err(e) => {
            if let Some(summary) = e.summary() {
                print_summary(summary, format)?;
            }
            Err(report(e))
        }
    }
}

fn report(e: DatasetMatchError) -> anyhow::Error {
    match e {
        DatasetMatchError::EmptyResult { .. } => {
            anyhow::anyhow!("{e}; check that the records and the backbone cover the same taxa")
        }
        other => other.into(),
    }
}

fn print_relations(sink: &MemoryRelationSink, dataset: &DatasetKey) {
    println!("{RELATION_HEADER}");
    for r in sink.relations(dataset) {
        println!(
            "{}\t{}\t{}\t{}\t{:.1}",
            dataset, r.source_id, r.usage_key, r.doubtful, r.confidence
        );
    }
}

fn print_summary(summary: &DatasetMatchSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Tsv => {
            println!("dataset_key\ttotal\tmatched\tdoubtful\tambiguous\tno_match\tparse_failed\tfailed\telapsed_ms");
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                summary.dataset_key,
                summary.total,
                summary.matched,
                summary.doubtful,
                summary.ambiguous,
                summary.no_match,
                summary.parse_failed,
                summary.failed_records,
                summary.elapsed_ms
            );
        }
    }
    Ok(())
}
