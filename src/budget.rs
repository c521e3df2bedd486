//! Budget scenario projection from historical platform performance.

use crate::dimensions::{self, GroupKey};
use crate::error::Result;
use crate::metrics;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proposed spend per platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetAllocation(pub BTreeMap<String, f64>);

impl BudgetAllocation {
    pub fn set(&mut self, platform: &str, spend: f64) {
        self.0.insert(platform.to_string(), spend);
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// The planner's default: split the total budget evenly across the
    /// given platforms.
    pub fn even_split(platforms: &[String], total_budget: f64) -> Self {
        if platforms.is_empty() {
            return Self::default();
        }
        let share = total_budget / platforms.len() as f64;
        Self(platforms.iter().map(|p| (p.clone(), share)).collect())
    }
}

/// Lifetime spend, revenue, and average roas for one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformHistory {
    pub platform: String,
    pub spend: f64,
    pub attributed_revenue: f64,
    pub avg_roas: f64,
}

/// Per-platform average roas over the full advertising history (no date
/// filter): sum of attributed revenue over sum of spend, zero-guarded.
pub fn historical_roas(ads: &DataFrame) -> Result<Vec<PlatformHistory>> {
    let rows = dimensions::grouped_performance(ads, GroupKey::Platform)?;
    Ok(rows
        .into_iter()
        .map(|r| PlatformHistory {
            platform: r.key.first().cloned().unwrap_or_default(),
            spend: r.spend,
            attributed_revenue: r.attributed_revenue,
            avg_roas: r.roas,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionLine {
    pub platform: String,
    pub allocated: f64,
    pub avg_roas: f64,
    pub projected_revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetProjection {
    pub lines: Vec<ProjectionLine>,
    pub total_budget: f64,
    pub total_allocated: f64,
    pub total_projected_revenue: f64,
    pub projected_roas: f64,
    /// Advisory: the allocation exceeds the total budget. Projections are
    /// still computed in full; surfacing the warning is the caller's call.
    pub over_allocated: bool,
    /// `total_budget - total_allocated`; negative when over-allocated.
    pub remaining_budget: f64,
}

/// Project revenue for a hypothetical allocation using each platform's
/// historical average roas. Platforms without history project at 0.
pub fn project(
    ads: &DataFrame,
    allocation: &BudgetAllocation,
    total_budget: f64,
) -> Result<BudgetProjection> {
    let history = historical_roas(ads)?;
    let by_platform: BTreeMap<&str, f64> = history
        .iter()
        .map(|h| (h.platform.as_str(), h.avg_roas))
        .collect();

    let lines: Vec<ProjectionLine> = allocation
        .0
        .iter()
        .map(|(platform, &allocated)| {
            let avg_roas = by_platform.get(platform.as_str()).copied().unwrap_or(0.0);
            ProjectionLine {
                platform: platform.clone(),
                allocated,
                avg_roas,
                projected_revenue: allocated * avg_roas,
            }
        })
        .collect();

    let total_allocated = allocation.total();
    let total_projected_revenue: f64 = lines.iter().map(|l| l.projected_revenue).sum();
    Ok(BudgetProjection {
        lines,
        total_budget,
        total_allocated,
        total_projected_revenue,
        projected_roas: metrics::ratio(total_projected_revenue, total_allocated),
        over_allocated: total_allocated > total_budget,
        remaining_budget: total_budget - total_allocated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::combine_sources;
    use crate::config::RenameTable;
    use crate::ingest;

    fn history() -> DataFrame {
        // platform A: lifetime spend 1000, revenue 4000 (avg roas 4.0x)
        let alpha = df![
            "date" => ["2024-01-01", "2024-01-02"],
            "tactic" => ["prospecting", "prospecting"],
            "state" => ["CA", "CA"],
            "campaign" => ["a1", "a2"],
            "spend" => [600.0, 400.0],
            "impressions" => [1000i64, 1000],
            "clicks" => [50i64, 40],
            "attributed revenue" => [2400.0, 1600.0]
        ]
        .unwrap();
        let beta = df![
            "date" => ["2024-01-01"],
            "tactic" => ["retargeting"],
            "state" => ["NY"],
            "campaign" => ["b1"],
            "spend" => [500.0],
            "impressions" => [2000i64],
            "clicks" => [80i64],
            "attributed revenue" => [1000.0]
        ]
        .unwrap();
        let sources = vec![
            (
                "Alpha".to_string(),
                ingest::conform_ad_frame(&alpha, "Alpha", &RenameTable::ad_default()).unwrap(),
            ),
            (
                "Beta".to_string(),
                ingest::conform_ad_frame(&beta, "Beta", &RenameTable::ad_default()).unwrap(),
            ),
        ];
        combine_sources(&sources).unwrap()
    }

    #[test]
    fn allocation_times_historical_roas_projects_revenue() {
        let ads = history();
        let mut allocation = BudgetAllocation::default();
        allocation.set("Alpha", 500.0);
        let projection = project(&ads, &allocation, 1000.0).unwrap();
        assert_eq!(projection.lines.len(), 1);
        assert!((projection.lines[0].avg_roas - 4.0).abs() < 1e-12);
        assert!((projection.lines[0].projected_revenue - 2000.0).abs() < 1e-12);
        assert!(!projection.over_allocated);
        assert_eq!(projection.remaining_budget, 500.0);
    }

    #[test]
    fn aggregate_projected_roas_is_revenue_over_allocation() {
        let ads = history();
        let mut allocation = BudgetAllocation::default();
        allocation.set("Alpha", 500.0);
        allocation.set("Beta", 500.0);
        let projection = project(&ads, &allocation, 1000.0).unwrap();
        // 500 * 4.0 + 500 * 2.0 = 3000 over 1000 allocated
        assert!((projection.total_projected_revenue - 3000.0).abs() < 1e-12);
        assert!(
            (projection.projected_roas
                - projection.total_projected_revenue / projection.total_allocated)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn over_allocation_is_flagged_but_still_projected() {
        let ads = history();
        let mut allocation = BudgetAllocation::default();
        allocation.set("Alpha", 600.0);
        allocation.set("Beta", 400.0);
        let exact = project(&ads, &allocation, 1000.0).unwrap();
        assert!(!exact.over_allocated);

        allocation.set("Beta", 401.0);
        let over = project(&ads, &allocation, 1000.0).unwrap();
        assert!(over.over_allocated);
        assert_eq!(over.remaining_budget, -1.0);
        assert!(over.total_projected_revenue > 0.0);
    }

    #[test]
    fn unknown_platforms_project_at_zero_roas() {
        let ads = history();
        let mut allocation = BudgetAllocation::default();
        allocation.set("Gamma", 500.0);
        let projection = project(&ads, &allocation, 1000.0).unwrap();
        assert_eq!(projection.lines[0].projected_revenue, 0.0);
        assert_eq!(projection.projected_roas, 0.0);
    }

    #[test]
    fn even_split_distributes_the_whole_budget() {
        let platforms = vec!["Alpha".to_string(), "Beta".to_string()];
        let allocation = BudgetAllocation::even_split(&platforms, 50_000.0);
        assert_eq!(allocation.0.len(), 2);
        assert_eq!(allocation.total(), 50_000.0);
        assert_eq!(allocation.0["Alpha"], 25_000.0);
        assert!(BudgetAllocation::even_split(&[], 1000.0).0.is_empty());
    }
}
