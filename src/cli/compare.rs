use clap::Args;

use crate::cli::OutputFormat;
use crate::core::normalize::normalize;
use crate::core::types::Equality;
use crate::matching::authorship::AuthorComparator;
use crate::parsing::name::parse_authorship;
use crate::similarity::Metric;

#[derive(Args)]
pub struct CompareArgs {
    /// First name (or authorship with --authors)
    #[arg(required = true)]
    pub a: String,

    /// Second name (or authorship with --authors)
    #[arg(required = true)]
    pub b: String,

    /// Similarity metric
    #[arg(short, long, value_enum, default_value = "scientific")]
    pub metric: Metric,

    /// Compare the arguments as authorships, e.g. "(L.) Mill. 1768"
    #[arg(long)]
    pub authors: bool,
}

/// Execute compare subcommand
///
/// # Errors
///
/// Returns an error if JSON output cannot be serialized.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CompareArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    if args.authors {
        let result = AuthorComparator::new()
            .compare_names(&parse_authorship(&args.a), &parse_authorship(&args.b));
        return print_author_comparison(&args, result, format);
    }

    let metric = args.metric.build();
    let similarity = metric.similarity(&args.a, &args.b);

    match format {
        OutputFormat::Text => {
            println!("Comparison Results");
            println!("{}", "=".repeat(60));
            println!("\nA: {}", args.a);
            println!("B: {}", args.b);
            if verbose {
                println!("\nNormalized A: {}", normalize(&args.a));
                println!("Normalized B: {}", normalize(&args.b));
            }
            println!("\n{} similarity: {similarity:.2}", metric.name());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "a": args.a,
                "b": args.b,
                "metric": metric.name(),
                "similarity": similarity,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("a\tb\tmetric\tsimilarity");
            println!("{}\t{}\t{}\t{similarity:.4}", args.a, args.b, metric.name());
        }
    }

    Ok(())
}

fn print_author_comparison(
    args: &CompareArgs,
    result: Equality,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{} vs {}: {result}", args.a, args.b),
        OutputFormat::Json => {
            let output = serde_json::json!({ "a": args.a, "b": args.b, "authors": result });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("a\tb\tauthors");
            println!("{}\t{}\t{result}", args.a, args.b);
        }
    }
    Ok(())
}
