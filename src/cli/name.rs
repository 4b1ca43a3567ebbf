use clap::Args;

use crate::cli::{BackboneArgs, ClassificationArgs, OutputFormat};
use crate::core::types::Rank;
use crate::matching::engine::{MatchOutcome, MatchResult, MatchingEngine, NameQuery, ScoredCandidate};

#[derive(Args)]
pub struct MatchArgs {
    /// Scientific name, optionally with authorship
    #[arg(required = true)]
    pub name: String,

    #[command(flatten)]
    pub backbone: BackboneArgs,

    /// Authorship, overrides any authorship in the name
    #[arg(long)]
    pub authorship: Option<String>,

    /// Rank of the name, e.g. species or genus
    #[arg(long)]
    pub rank: Option<Rank>,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    /// Only look up exact names
    #[arg(long)]
    pub no_fuzzy: bool,
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the backbone or configuration cannot be loaded or the name is invalid.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let index = args.backbone.load_index()?;
    let mut config = args.backbone.load_config()?;
    if args.no_fuzzy {
        config.fuzzy.enabled = false;
    }
    let authors = args.backbone.load_authors()?;

    if verbose {
        eprintln!(
            "Loaded backbone with {} usages and {} distinct names",
            index.len(),
            index.name_count()
        );
    }

    let mut query = NameQuery::new(&args.name).with_classification(args.classification.to_classification());
    query.authorship = args.authorship.clone();
    query.rank = args.rank;

    let engine = MatchingEngine::with_config(&index, config).with_authors(authors);
    let result = engine.match_name(&query)?;

    match format {
        OutputFormat::Text => print_text_result(&result, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Tsv => print_tsv_result(&result),
    }

    Ok(())
}

fn print_candidate(candidate: &ScoredCandidate, verbose: bool) {
    let usage = &candidate.usage;
    println!(
        "  {} {} {} [{}, {}]",
        usage.key,
        usage.canonical_name,
        usage.full_authorship().unwrap_or_default(),
        usage.rank,
        usage.status
    );
    println!("    Confidence: {:.1}", candidate.confidence());
    if verbose {
        let s = &candidate.score;
        println!(
            "    Name: {:.1}  Author: {} ({:+.0})  Rank: {:+.0}  Classification: {:+.0} (agreement {:.0})",
            s.name_score,
            s.author,
            s.author_adjustment,
            s.rank_adjustment,
            s.classification_adjustment,
            s.classification_score
        );
    }
}

fn print_text_result(result: &MatchResult, verbose: bool) {
    println!("Name: {}", result.query);
    println!("Outcome: {}", result.outcome.label());
    println!("Match type: {}", result.match_type);
    println!("Candidates scored: {}", result.candidate_count);

    match &result.outcome {
        MatchOutcome::Match(c) | MatchOutcome::Doubtful(c) => {
            println!("\nSelected:");
            print_candidate(c, verbose);
        }
        MatchOutcome::Ambiguous(candidates) => {
            println!("\nTied candidates:");
            for c in candidates {
                print_candidate(c, verbose);
            }
        }
        MatchOutcome::NoMatch(_) => {}
    }

    if !result.notes.is_empty() {
        println!("\nNotes:");
        for note in &result.notes {
            println!("  - {note}");
        }
    }
}

fn print_tsv_result(result: &MatchResult) {
    println!("name\toutcome\tmatch_type\tusage_key\tcanonical_name\tconfidence");
    let keys = match &result.outcome {
        MatchOutcome::Match(c) | MatchOutcome::Doubtful(c) => vec![c],
        MatchOutcome::Ambiguous(candidates) => candidates.iter().collect(),
        MatchOutcome::NoMatch(_) => Vec::new(),
    };
    if keys.is_empty() {
        println!(
            "{}\t{}\t{:?}\t\t\t",
            result.query,
            result.outcome.label(),
            result.match_type
        );
    }
    for c in keys {
        println!(
            "{}\t{}\t{:?}\t{}\t{}\t{:.1}",
            result.query,
            result.outcome.label(),
            result.match_type,
            c.key(),
            c.usage.canonical_name,
            c.confidence()
        );
    }
}
