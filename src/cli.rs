//! Command-line interface definitions and argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Loyal-customer and top-product analysis of purchase behaviour and transactions
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the purchase behaviour CSV file
    #[arg(long, default_value = "purchase_behaviour.csv")]
    pub purchase_file: PathBuf,

    /// Path to the transaction CSV file
    #[arg(long, default_value = "transaction_data.csv")]
    pub transaction_file: PathBuf,

    /// Output path for the chart dashboard
    #[arg(long, default_value = "analysis_results.png")]
    pub chart_output: PathBuf,

    /// Output path for the JSON summary
    #[arg(long, default_value = "analysis_results.json")]
    pub report_output: PathBuf,

    /// Percentile of per-customer transaction counts that marks a loyal customer
    #[arg(long, default_value = "80")]
    pub loyalty_percentile: f64,

    /// Number of products to keep, ranked by total revenue
    #[arg(long, default_value = "3")]
    pub top_n: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self::parse_from(["loyalty_insights"])
    }
}

impl Args {
    /// Reject settings the analysis cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=100.0).contains(&self.loyalty_percentile) {
            anyhow::bail!(
                "Loyalty percentile must be between 0 and 100, got {}",
                self.loyalty_percentile
            );
        }
        if self.top_n == 0 {
            anyhow::bail!("At least one top product must be requested");
        }
        Ok(())
    }
}
