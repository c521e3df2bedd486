//! Schema normalization for raw tabular sources.
//!
//! Raw per-platform files disagree on column labels. Normalization
//! canonicalizes every label, applies the source's rename table, and
//! verifies the columns the rest of the pipeline depends on. The input
//! frame is never mutated; normalization returns a fresh copy.

use crate::config::RenameTable;
use crate::error::{EngineError, Result};
use polars::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Columns every ad source must provide after normalization.
pub const AD_REQUIRED: &[&str] = &[
    "date",
    "tactic",
    "state",
    "campaign",
    "spend",
    "impressions",
    "clicks",
    "attributed_revenue",
];

/// Columns the business source must provide after normalization.
pub const BUSINESS_REQUIRED: &[&str] = &[
    "date",
    "orders",
    "new_orders",
    "new_customers",
    "total_revenue",
    "gross_profit",
];

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Canonicalize a raw column label: trim, lower-case, collapse internal
/// whitespace runs to a single underscore.
pub fn canonical_label(raw: &str) -> String {
    whitespace_re()
        .replace_all(raw.trim(), "_")
        .to_lowercase()
}

/// Produce a normalized copy of `df`: canonical labels plus the source's
/// rename table. Columns not named by the table pass through untouched.
pub fn normalize_columns(df: &DataFrame, renames: &RenameTable) -> Result<DataFrame> {
    let canonical_renames: BTreeMap<String, String> = renames
        .0
        .iter()
        .map(|(k, v)| (canonical_label(k), v.clone()))
        .collect();

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| {
            let canon = canonical_label(name);
            canonical_renames.get(&canon).cloned().unwrap_or(canon)
        })
        .collect();

    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(EngineError::Schema(format!(
                "column '{}' appears more than once after normalization",
                name
            )));
        }
    }

    let mut out = df.clone();
    out.set_column_names(&names)?;
    Ok(out)
}

/// Verify that every required column survived normalization.
pub fn require_columns(df: &DataFrame, required: &[&str], source: &str) -> Result<()> {
    let present: HashSet<&str> = df.get_column_names().into_iter().collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Schema(format!(
            "{}: missing required column(s) after normalization: {}",
            source,
            missing.join(", ")
        )))
    }
}

/// Coerce the `date` column to the Date dtype. String columns are parsed
/// as calendar dates; datetimes are truncated to their date component.
pub fn ensure_date_column(df: DataFrame, source: &str) -> Result<DataFrame> {
    let dtype = df.column("date")?.dtype().clone();
    match dtype {
        DataType::Date => Ok(df),
        DataType::Datetime(_, _) => Ok(df
            .lazy()
            .with_columns([col("date").cast(DataType::Date)])
            .collect()?),
        DataType::String => df
            .lazy()
            .with_columns([col("date").str().to_date(StrptimeOptions::default())])
            .collect()
            .map_err(|e| {
                EngineError::Schema(format!(
                    "{}: cannot parse 'date' as a calendar date: {}",
                    source, e
                ))
            }),
        other => Err(EngineError::Schema(format!(
            "{}: 'date' has unsupported dtype {:?}",
            source, other
        ))),
    }
}

/// Cast ad measure and dimension columns to their canonical dtypes and
/// zero-fill missing measure cells.
pub fn conform_ad_frame(df: DataFrame, source: &str) -> Result<DataFrame> {
    df.lazy()
        .with_columns([
            col("campaign").cast(DataType::String),
            col("tactic").cast(DataType::String),
            col("state").cast(DataType::String),
            col("spend").strict_cast(DataType::Float64).fill_null(lit(0.0)),
            col("attributed_revenue")
                .strict_cast(DataType::Float64)
                .fill_null(lit(0.0)),
            col("impressions").strict_cast(DataType::Int64).fill_null(lit(0i64)),
            col("clicks").strict_cast(DataType::Int64).fill_null(lit(0i64)),
        ])
        .collect()
        .map_err(|e| {
            EngineError::Schema(format!(
                "{}: cannot conform measures to canonical types: {}",
                source, e
            ))
        })
}

/// Cast business measure columns to their canonical dtypes and zero-fill
/// missing cells.
pub fn conform_business_frame(df: DataFrame, source: &str) -> Result<DataFrame> {
    df.lazy()
        .with_columns([
            col("orders").strict_cast(DataType::Int64).fill_null(lit(0i64)),
            col("new_orders").strict_cast(DataType::Int64).fill_null(lit(0i64)),
            col("new_customers")
                .strict_cast(DataType::Int64)
                .fill_null(lit(0i64)),
            col("total_revenue")
                .strict_cast(DataType::Float64)
                .fill_null(lit(0.0)),
            col("gross_profit")
                .strict_cast(DataType::Float64)
                .fill_null(lit(0.0)),
        ])
        .collect()
        .map_err(|e| {
            EngineError::Schema(format!(
                "{}: cannot conform measures to canonical types: {}",
                source, e
            ))
        })
}
