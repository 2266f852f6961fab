//! Integration tests for Loyalty Insights

use loyalty_insights::schema::{CUSTOMER_ID, PURCHASE_BEHAVIOUR, TRANSACTIONS};
use loyalty_insights::{
    analyze, clean_table, load_table, merge_tables, percentile, run_analysis, Args,
};
use polars::prelude::DataFrame;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

const PURCHASE_HEADER: &str = "LYLTY_CARD_NBR,LIFESTAGE,PREMIUM_CUSTOMER";
const TRANSACTION_HEADER: &str =
    "DATE,STORE_NBR,LYLTY_CARD_NBR,TXN_ID,PROD_NBR,PROD_NAME,PROD_QTY,TOT_SALES";

/// Write both input files into a fresh directory
fn write_inputs(purchases: &[&str], transactions: &[&str]) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let purchase_path = dir.path().join("purchase_behaviour.csv");
    let transaction_path = dir.path().join("transaction_data.csv");

    let mut purchase_csv = vec![PURCHASE_HEADER];
    purchase_csv.extend_from_slice(purchases);
    fs::write(&purchase_path, purchase_csv.join("\n")).unwrap();

    let mut transaction_csv = vec![TRANSACTION_HEADER];
    transaction_csv.extend_from_slice(transactions);
    fs::write(&transaction_path, transaction_csv.join("\n")).unwrap();

    (dir, purchase_path, transaction_path)
}

/// Customer 1000 is a heavy buyer; the rest buy once or twice
fn sample_inputs() -> (TempDir, PathBuf, PathBuf) {
    write_inputs(
        &[
            "1000,OLDER FAMILIES,Budget",
            "1001,YOUNG FAMILIES,Mainstream",
            "1002,RETIREES,Premium",
            "1003,MIDAGE SINGLES/COUPLES,Budget",
            "1004,NEW FAMILIES,",
            "1004,NEW FAMILIES,",
        ],
        &[
            "43390,1,1000,1,5,Natural Chip Compny SeaSalt175g,2,6.0",
            "43391,1,1000,2,5,Natural Chip Compny SeaSalt175g,2,6.0",
            "43392,1,1000,3,58,Red Rock Deli Chikn&Garlic Aioli 150g,1,2.7",
            "43393,1,1000,4,52,Grain Waves Sour Cream&Chives 210G,1,3.6",
            "43394,1,1000,5,106,Natural ChipCo Hony Soy Chckn175g,1,3.0",
            "43395,1,1000,6,96,WW Original Stacked Chips 160g,1,1.9",
            "43396,2,1001,7,5,Natural Chip Compny SeaSalt175g,1,3.0",
            "43397,2,1001,8,58,Red Rock Deli Chikn&Garlic Aioli 150g,1,2.7",
            "43398,2,1002,9,52,Grain Waves Sour Cream&Chives 210G,2,7.2",
            "43399,3,1003,10,106,,1,",
            "43399,3,1003,10,106,,1,",
            "43400,3,1009,11,96,WW Original Stacked Chips 160g,1,1.9",
        ],
    )
}

#[test]
fn test_analyze_end_to_end() {
    let (_dir, purchases, transactions) = sample_inputs();
    let analysis = analyze(&purchases, &transactions, 80.0, 3).unwrap();

    // 12 rows minus one exact duplicate
    assert_eq!(analysis.merged_rows, 11);

    // Counts [1, 1, 1, 2, 6]: rank 3.2 -> 2 + 4 * 0.2
    assert!((analysis.loyalty_threshold - 2.8).abs() < 1e-9);
    assert_eq!(analysis.loyal_customer_ids, vec![1000]);
    assert_eq!(analysis.profile.lifestages.get("OLDER FAMILIES"), Some(6));
    assert_eq!(analysis.profile.premium_tiers.get("Budget"), Some(6));
    assert_eq!(analysis.profile.avg_transaction_value, 3.87);

    let top: Vec<i64> = analysis.top_products.iter().map(|m| m.product_id).collect();
    assert_eq!(top, vec![5, 52, 106]);
    assert_eq!(analysis.top_products[0].total_revenue, 15.0);
    assert_eq!(analysis.top_products[0].unique_customers, 2);
    assert_eq!(analysis.top_products[0].avg_revenue_per_customer, 7.5);
    // Product 106's missing sale is filled with the mean of the others, 3.8
    assert_eq!(analysis.top_products[2].total_revenue, 6.8);
}

#[test]
fn test_summary_json_shape() {
    let (_dir, purchases, transactions) = sample_inputs();
    let analysis = analyze(&purchases, &transactions, 80.0, 3).unwrap();

    let json = analysis.summary().to_json_string().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();

    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.contains(&"top_products"));
    assert!(keys.contains(&"loyal_customer_profile"));
    assert!(keys.contains(&"hypothesis"));

    assert_eq!(value["top_products"]["sales_count"]["5"], 3);
    assert_eq!(
        value["loyal_customer_profile"]["lifestage_distribution"]["OLDER FAMILIES"],
        6
    );
    assert_eq!(
        value["loyal_customer_profile"]["avg_transaction_value"],
        3.87
    );
}

#[test]
fn test_two_customer_scenario() {
    let mut transactions = Vec::new();
    for txn in 0..10 {
        transactions.push(format!("43390,1,1,{},7,Chips,1,4.5", txn));
    }
    transactions.push("43390,1,2,10,8,Salsa,1,2.0".to_string());
    let rows: Vec<&str> = transactions.iter().map(|s| s.as_str()).collect();

    let (_dir, purchases, transactions) =
        write_inputs(&["1,YOUNG,Mainstream", "2,OLDER,Budget"], &rows);
    let analysis = analyze(&purchases, &transactions, 80.0, 3).unwrap();

    assert!(analysis.loyalty_threshold <= 10.0);
    assert_eq!(analysis.loyal_customer_ids, vec![1]);
    assert_eq!(analysis.profile.lifestages.get("YOUNG"), Some(10));
    assert_eq!(analysis.profile.lifestages.get("OLDER"), None);
}

#[test]
fn test_merge_preserves_transaction_count() {
    let (_dir, purchases, transactions) = sample_inputs();
    let (purchases, transactions) = load_clean(&purchases, &transactions);
    let n_transactions = transactions.height();

    let merged = merge_tables(transactions, purchases).unwrap();
    assert_eq!(merged.height(), n_transactions);
}

#[test]
fn test_loyal_subset_respects_population_threshold() {
    let (_dir, purchases, transactions) = sample_inputs();
    let (purchases, transactions) = load_clean(&purchases, &transactions);
    let merged = merge_tables(transactions, purchases).unwrap();

    let loyal = loyalty_insights::loyal_customers(&merged, 80.0).unwrap();
    let frequencies = loyalty_insights::customers::customer_frequencies(&merged).unwrap();
    let counts: Vec<f64> = frequencies.iter().map(|f| f.transactions as f64).collect();
    assert_eq!(loyal.threshold, percentile(&counts, 80.0).unwrap());

    let loyal_ids = loyal.rows.column(CUSTOMER_ID).unwrap().i64().unwrap();
    for id in loyal_ids.into_no_null_iter() {
        let count = frequencies
            .iter()
            .find(|f| f.customer_id == id)
            .unwrap()
            .transactions;
        assert!(count as f64 >= loyal.threshold);
    }
}

#[test]
fn test_missing_inputs_fail_without_outputs() {
    let dir = tempdir().unwrap();
    let args = args_in(dir.path());

    let result = run_analysis(&args);
    assert!(result.is_err());
    assert!(!args.chart_output.exists());
    assert!(!args.report_output.exists());
}

#[test]
fn test_invalid_percentile_rejected() {
    let (dir, _, _) = sample_inputs();
    let mut args = args_in(dir.path());
    args.loyalty_percentile = 150.0;
    assert!(run_analysis(&args).is_err());
    assert!(!args.report_output.exists());
}

#[test]
fn test_binary_reports_error_and_exits_nonzero() {
    let dir = tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_loyalty_insights"))
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error during analysis:"), "stderr: {stderr}");
    assert!(!dir.path().join("analysis_results.png").exists());
    assert!(!dir.path().join("analysis_results.json").exists());
}

#[test]
fn test_run_analysis_writes_both_outputs() {
    let (dir, _, _) = sample_inputs();
    let args = args_in(dir.path());

    let outcome = run_analysis(&args).unwrap();
    assert!(outcome.chart_path.exists());
    let report: Value =
        serde_json::from_str(&fs::read_to_string(&outcome.report_path).unwrap()).unwrap();
    assert!(report.get("hypothesis").is_some());
}

fn load_clean(purchases: &Path, transactions: &Path) -> (DataFrame, DataFrame) {
    let purchases = load_table(purchases, &PURCHASE_BEHAVIOUR).unwrap();
    let transactions = load_table(transactions, &TRANSACTIONS).unwrap();
    (
        clean_table(purchases, &PURCHASE_BEHAVIOUR).unwrap(),
        clean_table(transactions, &TRANSACTIONS).unwrap(),
    )
}

fn args_in(dir: &Path) -> Args {
    let mut args = Args::default();
    args.purchase_file = dir.join("purchase_behaviour.csv");
    args.transaction_file = dir.join("transaction_data.csv");
    args.chart_output = dir.join("analysis_results.png");
    args.report_output = dir.join("analysis_results.json");
    args
}
