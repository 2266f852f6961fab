//! Customer frequency analysis and the loyal-customer subset

use crate::schema::{CUSTOMER_ID, LIFESTAGE, PREMIUM_CUSTOMER, TOTAL_SALES};
use anyhow::{bail, ensure};
use polars::prelude::*;
use serde::ser::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const FREQUENCY: &str = "frequency";

/// Transaction count of a single customer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerFrequency {
    pub customer_id: i64,
    pub transactions: u64,
}

/// Customers at or above the loyalty threshold, with their merged rows
#[derive(Debug, Clone)]
pub struct LoyalCustomers {
    /// Percentile of the per-customer transaction counts
    pub threshold: f64,
    /// Qualifying customer identifiers, ascending
    pub customer_ids: Vec<i64>,
    /// Every merged row belonging to a qualifying customer
    pub rows: DataFrame,
}

/// Count merged rows per customer identifier, ordered by customer id
pub fn customer_frequencies(merged: &DataFrame) -> crate::Result<Vec<CustomerFrequency>> {
    let grouped = merged
        .clone()
        .lazy()
        .group_by([col(CUSTOMER_ID)])
        .agg([len().alias(FREQUENCY)])
        .collect()?;

    let ids = grouped.column(CUSTOMER_ID)?.cast(&DataType::Int64)?;
    let counts = grouped.column(FREQUENCY)?.cast(&DataType::UInt64)?;

    let mut frequencies: Vec<CustomerFrequency> = ids
        .i64()?
        .into_iter()
        .zip(counts.u64()?.into_no_null_iter())
        .filter_map(|(id, transactions)| {
            id.map(|customer_id| CustomerFrequency {
                customer_id,
                transactions,
            })
        })
        .collect();
    frequencies.sort_by_key(|f| f.customer_id);

    Ok(frequencies)
}

/// Percentile with linear interpolation between the closest ranks
///
/// Matches the default definition used by NumPy: the value at fractional
/// rank `p / 100 * (n - 1)` of the sorted input.
pub fn percentile(values: &[f64], p: f64) -> crate::Result<f64> {
    ensure!(
        (0.0..=100.0).contains(&p),
        "percentile must be within [0, 100], got {}",
        p
    );
    if values.is_empty() {
        bail!("cannot compute a percentile of an empty distribution");
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Select customers whose transaction count is at or above the given percentile
///
/// The threshold is computed once over every customer in `merged`; customers
/// tied with the threshold are included.
pub fn loyal_customers(merged: &DataFrame, loyalty_percentile: f64) -> crate::Result<LoyalCustomers> {
    let frequencies = customer_frequencies(merged)?;
    let counts: Vec<f64> = frequencies.iter().map(|f| f.transactions as f64).collect();
    let threshold = percentile(&counts, loyalty_percentile)?;

    let customer_ids: Vec<i64> = frequencies
        .iter()
        .filter(|f| f.transactions as f64 >= threshold)
        .map(|f| f.customer_id)
        .collect();
    let loyal: HashSet<i64> = customer_ids.iter().copied().collect();

    let mask: BooleanChunked = merged
        .column(CUSTOMER_ID)?
        .i64()?
        .into_iter()
        .map(|id| id.is_some_and(|id| loyal.contains(&id)))
        .collect();
    let rows = merged.filter(&mask)?;

    debug!(
        customers = frequencies.len(),
        threshold,
        loyal_customers = customer_ids.len(),
        loyal_rows = rows.height(),
        "Selected loyal customers"
    );

    Ok(LoyalCustomers {
        threshold,
        customer_ids,
        rows,
    })
}

/// Occurrence counts of distinct text values, nulls excluded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueCounts {
    /// `(value, count)` in order of first appearance
    entries: Vec<(String, u64)>,
}

impl ValueCounts {
    /// Count the non-null values of a text column
    pub fn from_column(column: &Column) -> crate::Result<Self> {
        Ok(column.str()?.into_iter().flatten().collect())
    }

    /// Entries in order of first appearance
    pub fn in_appearance_order(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// Entries by descending count; ties keep their first-appearance order
    pub fn by_frequency(&self) -> Vec<(String, u64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }

    pub fn get(&self, value: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, count)| *count)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest single count, 0 when empty
    pub fn max_count(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c).max().unwrap_or(0)
    }
}

impl<'a> FromIterator<&'a str> for ValueCounts {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut index: HashMap<&'a str, usize> = HashMap::new();
        let mut entries: Vec<(String, u64)> = Vec::new();
        for value in iter {
            match index.get(value) {
                Some(&i) => entries[i].1 += 1,
                None => {
                    index.insert(value, entries.len());
                    entries.push((value.to_string(), 1));
                }
            }
        }
        Self { entries }
    }
}

impl Serialize for ValueCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.by_frequency())
    }
}

/// Segment breakdown and spend of the loyal-customer rows
#[derive(Debug, Clone)]
pub struct LoyalProfile {
    pub lifestages: ValueCounts,
    pub premium_tiers: ValueCounts,
    /// Sale amount of every loyal row
    pub sales: Vec<f64>,
    /// Mean sale amount, rounded to 2 decimals
    pub avg_transaction_value: f64,
}

impl LoyalProfile {
    pub fn from_rows(rows: &DataFrame) -> crate::Result<Self> {
        ensure!(rows.height() > 0, "loyal customer subset is empty");

        let lifestages = ValueCounts::from_column(rows.column(LIFESTAGE)?)?;
        let premium_tiers = ValueCounts::from_column(rows.column(PREMIUM_CUSTOMER)?)?;

        let sales: Vec<f64> = rows
            .column(TOTAL_SALES)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        ensure!(!sales.is_empty(), "loyal customer subset has no sale amounts");
        let mean = sales.iter().sum::<f64>() / sales.len() as f64;

        Ok(Self {
            lifestages,
            premium_tiers,
            sales,
            avg_transaction_value: crate::round2(mean),
        })
    }
}
