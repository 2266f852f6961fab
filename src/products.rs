//! Per-product sales aggregation

use crate::schema::{CUSTOMER_ID, PRODUCT_ID, TOTAL_SALES};
use polars::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

/// Sales figures for one product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMetrics {
    pub product_id: i64,
    /// Number of rows with a sale amount
    pub sales_count: u64,
    /// Sum of sale amounts, rounded to 2 decimals
    pub total_revenue: f64,
    /// Distinct customers who bought the product
    pub unique_customers: u64,
    /// `total_revenue / unique_customers`, rounded to 2 decimals
    pub avg_revenue_per_customer: f64,
}

/// Aggregate sales per product, ordered by ascending product id
pub fn product_metrics(merged: &DataFrame) -> crate::Result<Vec<ProductMetrics>> {
    let grouped = merged
        .clone()
        .lazy()
        .group_by([col(PRODUCT_ID)])
        .agg([
            col(TOTAL_SALES).count().alias("sales_count"),
            col(TOTAL_SALES).sum().alias("total_revenue"),
            col(CUSTOMER_ID).drop_nulls().n_unique().alias("unique_customers"),
        ])
        .collect()?;

    let ids = grouped.column(PRODUCT_ID)?.cast(&DataType::Int64)?;
    let counts = grouped.column("sales_count")?.cast(&DataType::UInt64)?;
    let revenue = grouped.column("total_revenue")?.cast(&DataType::Float64)?;
    let customers = grouped.column("unique_customers")?.cast(&DataType::UInt64)?;

    let mut metrics = Vec::with_capacity(grouped.height());
    for (((id, sales_count), total), unique_customers) in ids
        .i64()?
        .into_iter()
        .zip(counts.u64()?.into_iter())
        .zip(revenue.f64()?.into_iter())
        .zip(customers.u64()?.into_iter())
    {
        // Rows without a product id form no product
        let Some(product_id) = id else {
            continue;
        };
        let total_revenue = crate::round2(total.unwrap_or(0.0));
        let unique_customers = unique_customers.unwrap_or(0);
        let avg_revenue_per_customer = if unique_customers == 0 {
            0.0
        } else {
            crate::round2(total_revenue / unique_customers as f64)
        };

        metrics.push(ProductMetrics {
            product_id,
            sales_count: sales_count.unwrap_or(0),
            total_revenue,
            unique_customers,
            avg_revenue_per_customer,
        });
    }
    metrics.sort_by_key(|m| m.product_id);

    debug!(products = metrics.len(), "Aggregated product metrics");

    Ok(metrics)
}

/// The `n` products with the highest revenue, best first
///
/// Ties keep the input order, so with [`product_metrics`] output the lower
/// product id wins.
pub fn top_products(mut metrics: Vec<ProductMetrics>, n: usize) -> Vec<ProductMetrics> {
    metrics.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    metrics.truncate(n);
    metrics
}

/// Product metrics laid out column-wise, each column keyed by product id
#[derive(Debug, Clone, Default)]
pub struct TopProducts(pub Vec<ProductMetrics>);

impl TopProducts {
    pub fn products(&self) -> &[ProductMetrics] {
        &self.0
    }
}

/// One metric of every product as a `{product_id: value}` map
struct ByProduct<'a, F>(&'a [ProductMetrics], F);

impl<T, F> Serialize for ByProduct<'_, F>
where
    T: Serialize,
    F: Fn(&ProductMetrics) -> T,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|m| (m.product_id.to_string(), (self.1)(m))))
    }
}

impl Serialize for TopProducts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let products = self.products();
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("sales_count", &ByProduct(products, |m: &ProductMetrics| m.sales_count))?;
        map.serialize_entry(
            "total_revenue",
            &ByProduct(products, |m: &ProductMetrics| m.total_revenue),
        )?;
        map.serialize_entry(
            "unique_customers",
            &ByProduct(products, |m: &ProductMetrics| m.unique_customers),
        )?;
        map.serialize_entry(
            "avg_revenue_per_customer",
            &ByProduct(products, |m: &ProductMetrics| m.avg_revenue_per_customer),
        )?;
        map.end()
    }
}
