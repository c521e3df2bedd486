//! CSV source ingestion.

use crate::config::{AdSourceSpec, BusinessSourceSpec, RenameTable};
use crate::error::{EngineError, Result};
use crate::normalize;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Read one raw CSV into memory. Dates are parsed eagerly; schema
/// inference is bounded so a stray late row cannot flip a column's dtype.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = LazyCsvReader::new(path)
        .with_try_parse_dates(true)
        .with_infer_schema_length(Some(1000))
        .finish()
        .map_err(|e| EngineError::Polars(format!("failed to read {}: {}", path.display(), e)))?
        .collect()
        .map_err(|e| EngineError::Polars(format!("failed to load {}: {}", path.display(), e)))?;
    debug!("read {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Normalize and conform one raw ad frame. The platform tag itself is
/// assigned later, at combine time.
pub fn conform_ad_frame(raw: &DataFrame, platform: &str, renames: &RenameTable) -> Result<DataFrame> {
    let df = normalize::normalize_columns(raw, renames)?;
    normalize::require_columns(&df, normalize::AD_REQUIRED, platform)?;
    let df = normalize::ensure_date_column(df, platform)?;
    normalize::conform_ad_frame(df, platform)
}

/// Normalize and conform the raw business frame.
pub fn conform_business_frame(raw: &DataFrame, renames: &RenameTable) -> Result<DataFrame> {
    let df = normalize::normalize_columns(raw, renames)?;
    normalize::require_columns(&df, normalize::BUSINESS_REQUIRED, "business")?;
    let df = normalize::ensure_date_column(df, "business")?;
    normalize::conform_business_frame(df, "business")
}

/// Load one configured ad source from disk.
pub fn load_ad_source(spec: &AdSourceSpec) -> Result<DataFrame> {
    let raw = read_csv(&spec.path)?;
    let df = conform_ad_frame(&raw, &spec.platform, &spec.renames)?;
    info!("loaded ad source '{}' ({} rows)", spec.platform, df.height());
    Ok(df)
}

/// Load the configured business source from disk.
pub fn load_business(spec: &BusinessSourceSpec) -> Result<DataFrame> {
    let raw = read_csv(&spec.path)?;
    let df = conform_business_frame(&raw, &spec.renames)?;
    info!("loaded business source ({} rows)", df.height());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ad_frame_is_conformed_end_to_end() {
        let raw = df![
            "Date" => ["2024-01-01", "2024-01-02"],
            "Tactic" => ["prospecting", "retargeting"],
            "State" => ["CA", "NY"],
            "Campaign" => ["c1", "c2"],
            "Spend" => [100i64, 200i64],
            "Impression" => [1000i64, 2000i64],
            "Clicks" => [10i64, 20i64],
            "Attributed Revenue" => [400.0, 300.0]
        ]
        .unwrap();
        let df = conform_ad_frame(&raw, "Facebook", &RenameTable::ad_default()).unwrap();
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("spend").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("impressions").unwrap().i64().unwrap().get(1), Some(2000));
    }

    #[test]
    fn ad_frame_without_clicks_fails_the_load() {
        let raw = df![
            "date" => ["2024-01-01"],
            "tactic" => ["prospecting"],
            "state" => ["CA"],
            "campaign" => ["c1"],
            "spend" => [100.0],
            "impression" => [1000i64],
            "attributed revenue" => [400.0]
        ]
        .unwrap();
        let err = conform_ad_frame(&raw, "Google", &RenameTable::ad_default()).unwrap_err();
        assert!(matches!(err, EngineError::Schema(_)));
    }
}
