use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Ad measure columns summed per calendar date.
pub const AD_MEASURES: &[&str] = &["spend", "impressions", "clicks", "attributed_revenue"];

/// Collapse the unified advertising dataset to one row per distinct date.
/// Dates with no advertising rows are not introduced here; the business
/// join supplies them.
pub fn aggregate_daily(ads: &DataFrame) -> Result<DataFrame> {
    Ok(ads
        .clone()
        .lazy()
        .group_by_stable([col("date")])
        .agg(
            AD_MEASURES
                .iter()
                .map(|c| col(*c).sum())
                .collect::<Vec<_>>(),
        )
        .sort(["date"], SortMultipleOptions::default())
        .collect()?)
}

/// LEFT OUTER JOIN of business outcomes (driving side) with the daily ad
/// aggregate. Business dates with no advertising rows get zeros: no spend
/// recorded means zero spend, not missing data.
pub fn join_business(business: &DataFrame, daily_ads: &DataFrame) -> Result<DataFrame> {
    if business.height() == 0 {
        return Err(EngineError::Join("business source has no rows".to_string()));
    }
    let joined = business
        .clone()
        .lazy()
        .join(
            daily_ads.clone().lazy(),
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([
            col("spend").fill_null(lit(0.0)),
            col("impressions").fill_null(lit(0i64)),
            col("clicks").fill_null(lit(0i64)),
            col("attributed_revenue").fill_null(lit(0.0)),
        ])
        .collect()?;
    info!(
        "joined {} business day(s) against the advertising daily aggregate",
        joined.height()
    );
    Ok(joined)
}

/// A business date recorded more than once in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateDate {
    pub date: NaiveDate,
    pub count: u32,
}

/// Surface duplicate business dates as a diagnostic. Whether they are
/// multi-entry corrections or data-entry defects is the caller's call;
/// the join leaves them untouched.
pub fn detect_duplicate_dates(business: &DataFrame) -> Result<Vec<DuplicateDate>> {
    let dupes = business
        .clone()
        .lazy()
        .group_by_stable([col("date")])
        .agg([len().alias("count")])
        .filter(col("count").gt(lit(1u32)))
        .sort(["date"], SortMultipleOptions::default())
        .collect()?;

    let dates = dupes.column("date")?.date()?;
    let counts = dupes.column("count")?.u32()?;
    let mut out = Vec::with_capacity(dupes.height());
    for i in 0..dupes.height() {
        if let (Some(days), Some(count)) = (dates.get(i), counts.get(i)) {
            out.push(DuplicateDate {
                date: date_from_epoch_days(days),
                count,
            });
        }
    }
    if !out.is_empty() {
        warn!(
            "business source has {} duplicate date(s); rows are kept as-is",
            out.len()
        );
    }
    Ok(out)
}

/// Days-since-epoch (the physical Date representation) to a calendar date.
pub(crate) fn date_from_epoch_days(days: i32) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days + 719_163).unwrap_or(NaiveDate::MIN)
}
