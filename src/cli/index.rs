use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::catalog::store::CandidateIndex;
use crate::cli::OutputFormat;
use crate::core::normalize::normalize;
use crate::core::types::{Rank, UsageKey};
use crate::core::usage::CandidateUsage;

#[derive(Args)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommands,

    /// Backbone snapshot (JSON or TSV, optionally gzipped)
    #[arg(short, long, global = true)]
    pub backbone: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Summarize the backbone
    Stats,

    /// List the usages sharing a name
    Lookup {
        /// Scientific name without authorship
        name: String,
    },

    /// Show one usage
    Show {
        /// Usage key
        key: UsageKey,
    },

    /// Export the backbone as a JSON snapshot
    Export {
        /// Output file
        output: PathBuf,
    },
}

/// Execute index subcommand
///
/// # Errors
///
/// Returns an error if the backbone cannot be loaded, a usage is not found, or the export fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: IndexArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let path = args
        .backbone
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("--backbone is required"))?;
    let index = crate::catalog::snapshot::SnapshotFile::new(path)?.load_index()?;

    if verbose {
        eprintln!("Loaded {} usages from {}", index.len(), path.display());
    }

    match args.command {
        IndexCommands::Stats => print_stats(&index, format)?,
        IndexCommands::Lookup { name } => {
            let usages = index.lookup(&normalize(&name));
            if usages.is_empty() {
                eprintln!("No usage named '{name}'");
            }
            print_usages(&usages, format)?;
        }
        IndexCommands::Show { key } => {
            let usage = index
                .lookup_by_key(key)
                .ok_or_else(|| anyhow::anyhow!("Usage {key} not found"))?;
            print_usages(&[usage], format)?;
        }
        IndexCommands::Export { output } => {
            std::fs::write(&output, index.to_json()?)?;
            eprintln!("Exported {} usages to {}", index.len(), output.display());
        }
    }

    Ok(())
}

fn print_stats(index: &CandidateIndex, format: OutputFormat) -> anyhow::Result<()> {
    let mut by_rank: std::collections::BTreeMap<Rank, usize> = std::collections::BTreeMap::new();
    let mut synonyms = 0;
    for usage in index.iter() {
        *by_rank.entry(usage.rank).or_default() += 1;
        if usage.status.is_synonym() {
            synonyms += 1;
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Usages: {}", index.len());
            println!("Distinct names: {}", index.name_count());
            println!("Homonyms: {}", index.homonym_count());
            println!("Synonyms: {synonyms}");
            println!("\nBy rank:");
            for (rank, count) in &by_rank {
                println!("  {rank}: {count}");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "usages": index.len(),
                "names": index.name_count(),
                "homonyms": index.homonym_count(),
                "synonyms": synonyms,
                "by_rank": by_rank,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("rank\tcount");
            for (rank, count) in &by_rank {
                println!("{rank}\t{count}");
            }
        }
    }
    Ok(())
}

fn print_usages(usages: &[&CandidateUsage], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for usage in usages {
                println!(
                    "{} {} {}",
                    usage.key,
                    usage.canonical_name,
                    usage.full_authorship().unwrap_or_default()
                );
                println!("  Rank: {}  Status: {}", usage.rank, usage.status);
                if let Some(accepted) = usage.accepted_key {
                    println!("  Accepted: {accepted}");
                }
                let classification: Vec<String> = crate::core::classification::HigherRank::ALL
                    .iter()
                    .filter_map(|r| usage.classification.get(*r).map(|n| format!("{}={n}", r.as_str())))
                    .collect();
                if !classification.is_empty() {
                    println!("  Classification: {}", classification.join(", "));
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(usages)?),
        OutputFormat::Tsv => {
            println!("key\tcanonical_name\trank\tstatus\tauthorship");
            for usage in usages {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    usage.key,
                    usage.canonical_name,
                    usage.rank,
                    usage.status,
                    usage.full_authorship().unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
