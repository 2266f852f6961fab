//! Loyalty Insights: loyal-customer and top-product analysis of retail transactions
//!
//! Loads purchase behaviour and transaction CSVs, cleans and joins them,
//! selects customers at or above a transaction-frequency percentile, ranks
//! products by revenue, and writes a chart dashboard plus a JSON summary.

pub mod cli;
pub mod customers;
pub mod data;
pub mod pipeline;
pub mod products;
pub mod report;
pub mod schema;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use customers::{loyal_customers, percentile, LoyalCustomers, LoyalProfile, ValueCounts};
pub use data::{clean_table, load_table, merge_tables};
pub use pipeline::{analyze, run_analysis, Analysis, AnalysisOutcome};
pub use products::{product_metrics, top_products, ProductMetrics};
pub use report::AnalysisSummary;
pub use viz::render_dashboard;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Round to 2 decimal places, ties to even
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
