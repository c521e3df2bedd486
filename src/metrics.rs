//! Ratio metric derivation.
//!
//! One policy everywhere: a zero denominator yields 0, never NaN, inf,
//! or an error. Aggregates divide pre-summed totals; per-row derivation
//! uses the same guard.

use polars::prelude::*;

/// Guarded ratio expression: `num / den` where `den > 0`, else 0.
pub fn guarded_ratio(num: Expr, den: Expr) -> Expr {
    when(den.clone().gt(lit(0.0)))
        .then(num.cast(DataType::Float64) / den.cast(DataType::Float64))
        .otherwise(lit(0.0))
}

/// Scalar twin of [`guarded_ratio`] for pre-summed aggregate totals.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Derive the per-row ratio metrics over a joined daily-performance frame.
pub fn with_row_metrics(lf: LazyFrame) -> LazyFrame {
    lf.with_columns([
        guarded_ratio(col("attributed_revenue"), col("spend")).alias("roas"),
        guarded_ratio(col("spend"), col("clicks")).alias("cpc"),
        (guarded_ratio(col("clicks"), col("impressions")) * lit(100.0)).alias("ctr"),
        guarded_ratio(col("spend"), col("orders")).alias("cpo"),
        guarded_ratio(col("spend"), col("new_customers")).alias("cac"),
    ])
}
