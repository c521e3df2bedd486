//! Dimensional rollups of the unified advertising dataset.

use crate::error::Result;
use crate::metrics::{guarded_ratio, ratio};
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Grouping key for dimensional rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Platform,
    Tactic,
    State,
    /// Campaigns are scoped to their platform.
    PlatformCampaign,
}

impl GroupKey {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            GroupKey::Platform => &["platform"],
            GroupKey::Tactic => &["tactic"],
            GroupKey::State => &["state"],
            GroupKey::PlatformCampaign => &["platform", "campaign"],
        }
    }
}

/// Group the unified ad frame by `key`: summed measures, guarded ratios
/// over the grouped sums, share-of-total columns, ordered by roas
/// descending. The sort is stable, so equal-roas groups keep their
/// first-seen order.
pub fn grouped_frame(ads: &DataFrame, key: GroupKey) -> Result<DataFrame> {
    let (total_spend, total_revenue) = frame_totals(ads)?;
    let spend_share = if total_spend > 0.0 {
        col("spend").cast(DataType::Float64) / lit(total_spend)
    } else {
        lit(0.0)
    };
    let revenue_share = if total_revenue > 0.0 {
        col("attributed_revenue").cast(DataType::Float64) / lit(total_revenue)
    } else {
        lit(0.0)
    };

    let key_cols: Vec<Expr> = key.columns().iter().map(|c| col(*c)).collect();
    Ok(ads
        .clone()
        .lazy()
        .group_by_stable(key_cols)
        .agg([
            col("spend").sum(),
            col("attributed_revenue").sum(),
            col("clicks").sum(),
            col("impressions").sum(),
        ])
        .with_columns([
            guarded_ratio(col("attributed_revenue"), col("spend")).alias("roas"),
            guarded_ratio(col("spend"), col("clicks")).alias("cpc"),
            (guarded_ratio(col("clicks"), col("impressions")) * lit(100.0)).alias("ctr"),
            spend_share.alias("spend_share"),
            revenue_share.alias("revenue_share"),
        ])
        .sort(
            ["roas"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()?)
}

fn frame_totals(ads: &DataFrame) -> Result<(f64, f64)> {
    if ads.height() == 0 {
        return Ok((0.0, 0.0));
    }
    let sums = ads
        .clone()
        .lazy()
        .select([col("spend").sum(), col("attributed_revenue").sum()])
        .collect()?;
    Ok((
        sums.column("spend")?.f64()?.get(0).unwrap_or(0.0),
        sums.column("attributed_revenue")?.f64()?.get(0).unwrap_or(0.0),
    ))
}

/// One rollup row: the dimension value(s) plus summed measures and
/// derived ratios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedPerformance {
    pub key: Vec<String>,
    pub spend: f64,
    pub attributed_revenue: f64,
    pub clicks: i64,
    pub impressions: i64,
    pub roas: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub spend_share: f64,
    pub revenue_share: f64,
}

impl GroupedPerformance {
    /// The dimension value as a single label (tuple keys joined).
    pub fn dimension_value(&self) -> String {
        self.key.join(" / ")
    }
}

/// Typed rows of [`grouped_frame`], in the frame's order.
pub fn grouped_performance(ads: &DataFrame, key: GroupKey) -> Result<Vec<GroupedPerformance>> {
    let df = grouped_frame(ads, key)?;
    if df.height() == 0 {
        warn!("grouping by {:?} produced no rows", key);
    }
    let spend = df.column("spend")?.f64()?;
    let revenue = df.column("attributed_revenue")?.f64()?;
    let clicks = df.column("clicks")?.i64()?;
    let impressions = df.column("impressions")?.i64()?;
    let roas = df.column("roas")?.f64()?;
    let cpc = df.column("cpc")?.f64()?;
    let ctr = df.column("ctr")?.f64()?;
    let spend_share = df.column("spend_share")?.f64()?;
    let revenue_share = df.column("revenue_share")?.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut key_values = Vec::with_capacity(key.columns().len());
        for column in key.columns() {
            key_values.push(
                df.column(column)?
                    .str()?
                    .get(i)
                    .unwrap_or("")
                    .to_string(),
            );
        }
        rows.push(GroupedPerformance {
            key: key_values,
            spend: spend.get(i).unwrap_or(0.0),
            attributed_revenue: revenue.get(i).unwrap_or(0.0),
            clicks: clicks.get(i).unwrap_or(0),
            impressions: impressions.get(i).unwrap_or(0),
            roas: roas.get(i).unwrap_or(0.0),
            cpc: cpc.get(i).unwrap_or(0.0),
            ctr: ctr.get(i).unwrap_or(0.0),
            spend_share: spend_share.get(i).unwrap_or(0.0),
            revenue_share: revenue_share.get(i).unwrap_or(0.0),
        });
    }
    Ok(rows)
}

/// Aggregate totals and ratios for one slice of the ad frame: the
/// channel KPI snapshot. Sums first, then divides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdSliceSummary {
    pub spend: f64,
    pub attributed_revenue: f64,
    pub clicks: i64,
    pub impressions: i64,
    pub roas: f64,
    pub cpc: f64,
    pub ctr: f64,
}

/// Aggregate an (already filtered) ad frame. Empty slices degrade to
/// zeroes, never an error.
pub fn ad_summary(ads: &DataFrame) -> Result<AdSliceSummary> {
    if ads.height() == 0 {
        warn!("empty ad slice; summary degrades to zero");
        return Ok(AdSliceSummary::default());
    }
    let sums = ads
        .clone()
        .lazy()
        .select([
            col("spend").sum(),
            col("attributed_revenue").sum(),
            col("clicks").sum(),
            col("impressions").sum(),
        ])
        .collect()?;
    let spend = sums.column("spend")?.f64()?.get(0).unwrap_or(0.0);
    let attributed_revenue = sums
        .column("attributed_revenue")?
        .f64()?
        .get(0)
        .unwrap_or(0.0);
    let clicks = sums.column("clicks")?.i64()?.get(0).unwrap_or(0);
    let impressions = sums.column("impressions")?.i64()?.get(0).unwrap_or(0);
    Ok(AdSliceSummary {
        spend,
        attributed_revenue,
        clicks,
        impressions,
        roas: ratio(attributed_revenue, spend),
        cpc: ratio(spend, clicks as f64),
        ctr: ratio(clicks as f64, impressions as f64) * 100.0,
    })
}

/// Best and worst groups by roas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoasExtremes {
    pub best: GroupedPerformance,
    pub worst: GroupedPerformance,
}

/// Pick the max- and min-roas groups. Ties resolve to the first-seen
/// group; if every group has zero spend there is nothing to rank and the
/// result is `None`.
pub fn roas_extremes(rows: &[GroupedPerformance]) -> Option<RoasExtremes> {
    if rows.is_empty() || rows.iter().all(|r| r.spend == 0.0) {
        return None;
    }
    let mut best = &rows[0];
    let mut worst = &rows[0];
    for row in &rows[1..] {
        if row.roas > best.roas {
            best = row;
        }
        if row.roas < worst.roas {
            worst = row;
        }
    }
    Some(RoasExtremes {
        best: best.clone(),
        worst: worst.clone(),
    })
}

/// Tactic extremes for one platform's slice of the ad frame. `None` when
/// the platform has no rows or no spend.
pub fn platform_tactic_extremes(ads: &DataFrame, platform: &str) -> Result<Option<RoasExtremes>> {
    let slice = ads
        .clone()
        .lazy()
        .filter(col("platform").eq(lit(platform)))
        .collect()?;
    if slice.height() == 0 {
        warn!("no advertising rows for platform '{}'", platform);
        return Ok(None);
    }
    let rows = grouped_performance(&slice, GroupKey::Tactic)?;
    Ok(roas_extremes(&rows))
}

/// Platforms present in the unified frame, in first-seen order.
pub fn platforms(ads: &DataFrame) -> Result<Vec<String>> {
    let ca = ads.column("platform")?.str()?;
    Ok(ca
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .unique()
        .collect())
}
