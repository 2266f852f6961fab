//! End-to-end analysis: load, clean, merge, aggregate, chart and report

use crate::cli::Args;
use crate::customers::{loyal_customers, LoyalProfile};
use crate::data::{clean_table, describe_table, load_table, merge_tables};
use crate::products::{product_metrics, top_products, ProductMetrics};
use crate::report::AnalysisSummary;
use crate::schema::{PURCHASE_BEHAVIOUR, TRANSACTIONS};
use crate::viz::render_dashboard;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// In-memory result of the analysis, before anything is written
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Rows in the merged table
    pub merged_rows: usize,
    pub loyalty_threshold: f64,
    pub loyal_customer_ids: Vec<i64>,
    pub profile: LoyalProfile,
    pub top_products: Vec<ProductMetrics>,
}

impl Analysis {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::new(&self.top_products, &self.profile)
    }
}

/// Successful run: what was computed and where it was written
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: Analysis,
    pub chart_path: PathBuf,
    pub report_path: PathBuf,
}

/// Load both inputs, clean and merge them, and compute the aggregates
///
/// Prints a schema diagnostic for each loaded table.
pub fn analyze(
    purchase_path: &Path,
    transaction_path: &Path,
    loyalty_percentile: f64,
    top_n: usize,
) -> crate::Result<Analysis> {
    let purchases = load_table(purchase_path, &PURCHASE_BEHAVIOUR)?;
    let transactions = load_table(transaction_path, &TRANSACTIONS)?;

    println!("\nDataset Info:");
    describe_table(PURCHASE_BEHAVIOUR.name, &purchases);
    describe_table(TRANSACTIONS.name, &transactions);

    let purchases = clean_table(purchases, &PURCHASE_BEHAVIOUR)?;
    let transactions = clean_table(transactions, &TRANSACTIONS)?;
    let merged = merge_tables(transactions, purchases)?;

    let loyal = loyal_customers(&merged, loyalty_percentile)?;
    let profile = LoyalProfile::from_rows(&loyal.rows)?;
    let top = top_products(product_metrics(&merged)?, top_n);

    info!(
        merged_rows = merged.height(),
        threshold = loyal.threshold,
        loyal_customers = loyal.customer_ids.len(),
        "Analysis computed"
    );

    Ok(Analysis {
        merged_rows: merged.height(),
        loyalty_threshold: loyal.threshold,
        loyal_customer_ids: loyal.customer_ids,
        profile,
        top_products: top,
    })
}

/// Run the full pipeline described by `args`
///
/// The chart is rendered only once every aggregate is computed, and the JSON
/// report only once the chart is written, so a failed run leaves neither.
pub fn run_analysis(args: &Args) -> crate::Result<AnalysisOutcome> {
    args.validate()?;
    let start_time = Instant::now();

    let analysis = analyze(
        &args.purchase_file,
        &args.transaction_file,
        args.loyalty_percentile,
        args.top_n,
    )?;

    render_dashboard(&analysis.profile, &analysis.top_products, &args.chart_output)?;
    analysis.summary().write_to(&args.report_output)?;

    info!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "Pipeline complete"
    );

    Ok(AnalysisOutcome {
        analysis,
        chart_path: args.chart_output.clone(),
        report_path: args.report_output.clone(),
    })
}
