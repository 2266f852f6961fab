//! Loading, cleaning and merging of the two input tables using Polars

use crate::schema::{ColumnKind, ColumnPolicy, FillStrategy, TableSchema, CUSTOMER_ID};
use anyhow::{anyhow, bail, ensure, Context};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Rows sampled by the CSV reader when inferring column dtypes
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Load a CSV file into a DataFrame and normalise its key column dtypes
///
/// # Arguments
/// * `path` - Path to the CSV file (header row required)
/// * `schema` - Column policy table for this file
///
/// # Returns
/// * DataFrame with identifier columns as `Int64` and amount columns as `Float64`
pub fn load_table(path: &Path, schema: &TableSchema) -> crate::Result<DataFrame> {
    ensure!(
        path.exists(),
        "{} data file not found: {}",
        schema.name,
        path.display()
    );

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("failed to read {}", path.display()))?;

    for required in schema.required_columns() {
        if df.column(required).is_err() {
            bail!(
                "{} data ({}) is missing required column `{}`",
                schema.name,
                path.display(),
                required
            );
        }
    }

    // Only cast columns that are actually present; optional ones may be absent.
    // Strict casts so a value that does not parse fails the load instead of
    // turning into a null that cleaning would later fill.
    let mut df = df;
    for policy in schema.columns {
        let target = match policy.kind {
            ColumnKind::Identifier => DataType::Int64,
            ColumnKind::Amount => DataType::Float64,
            ColumnKind::Inferred => continue,
        };
        let Ok(column) = df.column(policy.name) else {
            continue;
        };
        let converted = column
            .as_materialized_series()
            .strict_cast(&target)
            .with_context(|| {
                format!(
                    "{} column `{}` in {} has values that are not valid {}",
                    schema.name,
                    policy.name,
                    path.display(),
                    target
                )
            })?;
        df.with_column(converted)?;
    }

    debug!(
        table = schema.name,
        rows = df.height(),
        columns = df.width(),
        "Loaded table"
    );

    Ok(df)
}

/// Print row/column counts and per-column null counts and dtypes
pub fn describe_table(name: &str, df: &DataFrame) {
    println!("\n{} Data:", name);
    println!("  Rows: {}, Columns: {}", df.height(), df.width());
    println!(
        "  {:<20} {:>10} {:>10}  Dtype",
        "Column", "Non-Null", "Null"
    );
    for column in df.get_columns() {
        let nulls = column.null_count();
        println!(
            "  {:<20} {:>10} {:>10}  {}",
            column.name().to_string(),
            column.len() - nulls,
            nulls,
            column.dtype()
        );
    }
}

/// Remove duplicate rows and fill missing values per the schema's policy table
///
/// Duplicates are dropped before the fill values are computed, and once more
/// afterwards because filling can make two formerly distinct rows identical.
/// The result contains no nulls and no duplicate rows, so cleaning an already
/// clean table returns it unchanged.
pub fn clean_table(df: DataFrame, schema: &TableSchema) -> crate::Result<DataFrame> {
    let rows_before = df.height();
    let deduped = drop_duplicate_rows(df)?;

    let fills = fill_expressions(&deduped, schema)?;
    let cleaned = if fills.is_empty() {
        deduped
    } else {
        let filled = deduped.lazy().with_columns(fills).collect()?;
        drop_duplicate_rows(filled)?
    };

    debug!(
        table = schema.name,
        rows_before,
        rows_after = cleaned.height(),
        "Cleaned table"
    );

    Ok(cleaned)
}

/// Keep the first occurrence of every distinct row, preserving order
fn drop_duplicate_rows(df: DataFrame) -> crate::Result<DataFrame> {
    Ok(df
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?)
}

/// Build one `fill_null` expression per column that has missing values
fn fill_expressions(df: &DataFrame, schema: &TableSchema) -> crate::Result<Vec<Expr>> {
    let mut fills = Vec::new();

    for column in df.get_columns() {
        let nulls = column.null_count();
        if nulls == 0 {
            continue;
        }

        let name = column.name().to_string();
        let policy = schema.policy(&name).ok_or_else(|| {
            anyhow!(
                "{} column `{}` has {} missing values but no declared fill policy",
                schema.name,
                name,
                nulls
            )
        })?;

        if nulls == column.len() {
            bail!(
                "{} column `{}` has no non-missing values to derive a fill value from",
                schema.name,
                name
            );
        }

        fills.push(fill_expression(column, policy, schema)?);
    }

    Ok(fills)
}

fn fill_expression(column: &Column, policy: &ColumnPolicy, schema: &TableSchema) -> crate::Result<Expr> {
    let dtype = column.dtype().clone();

    match policy.fill {
        FillStrategy::Mode => {
            ensure!(
                dtype == DataType::String,
                "{} column `{}` uses mode fill but has non-text dtype {}",
                schema.name,
                policy.name,
                dtype
            );
            let mode = most_frequent(column.str()?)
                .ok_or_else(|| anyhow!("{} column `{}` has no mode", schema.name, policy.name))?;
            debug!(column = policy.name, fill = %mode, "Filling with mode");
            Ok(col(policy.name).fill_null(lit(mode)))
        }
        FillStrategy::Mean => {
            ensure!(
                dtype.is_primitive_numeric(),
                "{} column `{}` uses mean fill but has non-numeric dtype {}",
                schema.name,
                policy.name,
                dtype
            );
            let as_float = column.cast(&DataType::Float64)?;
            let mean = as_float
                .f64()?
                .mean()
                .ok_or_else(|| anyhow!("{} column `{}` has no mean", schema.name, policy.name))?;
            debug!(column = policy.name, fill = mean, "Filling with mean");

            // Identifiers must stay integral join keys; every other column
            // takes the exact mean, widening integer columns to Float64
            match policy.kind {
                ColumnKind::Identifier if !dtype.is_float() => {
                    Ok(col(policy.name).fill_null(lit(mean.round() as i64).cast(dtype)))
                }
                _ => Ok(col(policy.name)
                    .cast(DataType::Float64)
                    .fill_null(lit(mean))),
            }
        }
    }
}

/// Most frequent non-null value; ties resolve to the lexicographically smallest
pub(crate) fn most_frequent(values: &StringChunked) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a, count_a), (b, count_b)| count_a.cmp(count_b).then_with(|| b.cmp(a)))
        .map(|(value, _)| value.to_string())
}

/// Left-join transactions onto purchase behaviour by customer identifier
///
/// Every transaction row is kept; purchase-behaviour columns are null where
/// the customer is unknown. No deduplication happens after the join.
pub fn merge_tables(transactions: DataFrame, purchases: DataFrame) -> crate::Result<DataFrame> {
    let merged = transactions
        .lazy()
        .join(
            purchases.lazy(),
            [col(CUSTOMER_ID)],
            [col(CUSTOMER_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    debug!(rows = merged.height(), columns = merged.width(), "Merged tables");

    Ok(merged)
}
