//! JSON summary of the analysis

use crate::customers::{LoyalProfile, ValueCounts};
use crate::products::{ProductMetrics, TopProducts};
use anyhow::Context;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Interpretation of the loyal-customer profile written with every report
pub const HYPOTHESIS: &str = "Loyal customers are likely to be older families and young families who prefer budget and mainstream products. They might be attracted to these products due to their affordability and value for money, which is crucial for families managing expenses.";

/// Lifestage and premium-tier breakdown of loyal customers
#[derive(Debug, Clone, Serialize)]
pub struct LoyalCustomerSummary {
    pub lifestage_distribution: ValueCounts,
    pub premium_customer_ratio: ValueCounts,
    pub avg_transaction_value: f64,
}

/// Document written to `analysis_results.json`
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub top_products: TopProducts,
    pub loyal_customer_profile: LoyalCustomerSummary,
    pub hypothesis: String,
}

impl AnalysisSummary {
    pub fn new(top_products: &[ProductMetrics], profile: &LoyalProfile) -> Self {
        Self {
            top_products: TopProducts(top_products.to_vec()),
            loyal_customer_profile: LoyalCustomerSummary {
                lifestage_distribution: profile.lifestages.clone(),
                premium_customer_ratio: profile.premium_tiers.clone(),
                avg_transaction_value: profile.avg_transaction_value,
            },
            hypothesis: HYPOTHESIS.to_string(),
        }
    }

    /// Serialise with 4-space indentation
    pub fn to_json_string(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        self.write_pretty(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Write the summary to `path`, replacing any existing file
    pub fn write_to(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_pretty(&mut writer)?;
        writer.flush()?;

        debug!(path = %path.display(), "Report written");
        Ok(())
    }

    fn write_pretty<W: Write>(&self, writer: W) -> crate::Result<()> {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut serializer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn test_summary() -> AnalysisSummary {
        let profile = LoyalProfile {
            lifestages: ["OLDER FAMILIES", "YOUNG FAMILIES", "YOUNG FAMILIES"]
                .into_iter()
                .collect(),
            premium_tiers: ["Budget", "Mainstream", "Budget"].into_iter().collect(),
            sales: vec![7.4, 3.9, 8.8],
            avg_transaction_value: 6.7,
        };
        let products = vec![ProductMetrics {
            product_id: 4,
            sales_count: 3,
            total_revenue: 20.1,
            unique_customers: 2,
            avg_revenue_per_customer: 10.05,
        }];
        AnalysisSummary::new(&products, &profile)
    }

    #[test]
    fn test_top_level_keys() {
        let json = test_summary().to_json_string().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        for key in ["top_products", "loyal_customer_profile", "hypothesis"] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["hypothesis"], HYPOTHESIS);
    }

    #[test]
    fn test_profile_section() {
        let value: Value = serde_json::from_str(&test_summary().to_json_string().unwrap()).unwrap();
        let profile = &value["loyal_customer_profile"];
        assert_eq!(profile["lifestage_distribution"]["YOUNG FAMILIES"], 2);
        assert_eq!(profile["premium_customer_ratio"]["Mainstream"], 1);
        assert_eq!(profile["avg_transaction_value"], 6.7);
        assert_eq!(value["top_products"]["total_revenue"]["4"], 20.1);
    }

    #[test]
    fn test_four_space_indent_and_order() {
        let json = test_summary().to_json_string().unwrap();
        assert!(json.starts_with("{\n    \"top_products\": {\n        \"sales_count\""));
        // Distributions are written most frequent first
        let young = json.find("\"YOUNG FAMILIES\"").unwrap();
        let older = json.find("\"OLDER FAMILIES\"").unwrap();
        assert!(young < older);
    }

    #[test]
    fn test_write_to_overwrites() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("analysis_results.json");
        std::fs::write(&path, "stale").unwrap();

        test_summary().write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Value>(&written).is_ok());
    }
}
