use crate::error::Result;
use polars::prelude::*;

/// Canonical column order of the unified advertising dataset.
pub const AD_COLUMNS: &[&str] = &[
    "date",
    "platform",
    "campaign",
    "tactic",
    "state",
    "spend",
    "impressions",
    "clicks",
    "attributed_revenue",
];

/// Tag each normalized source with its platform and stack them in
/// source-list order. Every row is preserved: no dedup, no global sort,
/// intra-source order intact.
pub fn combine_sources(sources: &[(String, DataFrame)]) -> Result<DataFrame> {
    if sources.is_empty() {
        return empty_unified();
    }
    let select_exprs: Vec<Expr> = AD_COLUMNS.iter().map(|c| col(*c)).collect();
    let frames: Vec<LazyFrame> = sources
        .iter()
        .map(|(platform, df)| {
            df.clone()
                .lazy()
                .with_columns([lit(platform.clone()).alias("platform")])
                .select(select_exprs.clone())
        })
        .collect();
    Ok(concat(frames, UnionArgs::default())?.collect()?)
}

/// A zero-row frame with the unified schema.
fn empty_unified() -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new_empty("date", &DataType::Date),
        Series::new_empty("platform", &DataType::String),
        Series::new_empty("campaign", &DataType::String),
        Series::new_empty("tactic", &DataType::String),
        Series::new_empty("state", &DataType::String),
        Series::new_empty("spend", &DataType::Float64),
        Series::new_empty("impressions", &DataType::Int64),
        Series::new_empty("clicks", &DataType::Int64),
        Series::new_empty("attributed_revenue", &DataType::Float64),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenameTable;
    use crate::ingest;

    fn source(platform: &str, dates: &[&str], campaigns: &[&str]) -> (String, DataFrame) {
        let n = dates.len();
        let raw = df![
            "date" => dates,
            "tactic" => vec!["prospecting"; n],
            "state" => vec!["CA"; n],
            "campaign" => campaigns,
            "spend" => vec![10.0; n],
            "impressions" => vec![100i64; n],
            "clicks" => vec![5i64; n],
            "attributed_revenue" => vec![40.0; n]
        ]
        .unwrap();
        let df = ingest::conform_ad_frame(&raw, platform, &RenameTable::ad_default()).unwrap();
        (platform.to_string(), df)
    }

    #[test]
    fn output_height_is_the_sum_of_input_heights() {
        let a = source("Facebook", &["2024-01-01", "2024-01-02"], &["f1", "f2"]);
        let b = source("Google", &["2024-01-01"], &["g1"]);
        let unified = combine_sources(&[a, b]).unwrap();
        assert_eq!(unified.height(), 3);
    }

    #[test]
    fn every_row_keeps_its_platform_tag_and_source_order() {
        let a = source("Facebook", &["2024-01-01", "2024-01-02"], &["f1", "f2"]);
        let b = source("Google", &["2024-01-03"], &["g1"]);
        let unified = combine_sources(&[a, b]).unwrap();
        let platforms = unified.column("platform").unwrap().str().unwrap();
        assert_eq!(platforms.get(0), Some("Facebook"));
        assert_eq!(platforms.get(1), Some("Facebook"));
        assert_eq!(platforms.get(2), Some("Google"));
        let campaigns = unified.column("campaign").unwrap().str().unwrap();
        assert_eq!(campaigns.get(0), Some("f1"));
        assert_eq!(campaigns.get(1), Some("f2"));
    }

    #[test]
    fn no_sources_yields_the_empty_unified_schema() {
        let unified = combine_sources(&[]).unwrap();
        assert_eq!(unified.height(), 0);
        assert_eq!(unified.get_column_names(), AD_COLUMNS);
    }
}
