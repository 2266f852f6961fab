//! Loyalty Insights entrypoint
//!
//! Runs the analysis pipeline once and maps its outcome to the process exit
//! status.

use clap::Parser;
use loyalty_insights::{run_analysis, Args};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        println!("Loyalty Insights - Loyal Customer & Product Analysis");
        println!("====================================================");
    }

    match run_analysis(&args) {
        Ok(outcome) => {
            debug!(
                threshold = outcome.analysis.loyalty_threshold,
                loyal_customers = outcome.analysis.loyal_customer_ids.len(),
                "Run finished"
            );
            println!(
                "\nAnalysis complete! Check {} and {}",
                outcome.chart_path.display(),
                outcome.report_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            debug!(error = ?err, "Analysis failed");
            eprintln!("Error during analysis: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level picked by `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
