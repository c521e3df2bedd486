//! Period-over-period comparison.
//!
//! A caller-chosen window is compared against the immediately preceding
//! window of equal length. Aggregation always sums first and derives the
//! ratios from the summed totals.

use crate::error::Result;
use crate::metrics;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `end - start` in days. The inclusive span covers `duration + 1` days.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The immediately preceding window of equal length:
    /// `[start - duration - 1, end - duration - 1]`.
    pub fn preceding(&self) -> DateWindow {
        let shift = Duration::days(self.duration_days() + 1);
        DateWindow {
            start: self.start - shift,
            end: self.end - shift,
        }
    }
}

/// Rows of `df` whose date falls inside the window, inclusive both ends.
pub fn slice_window(df: &DataFrame, window: &DateWindow) -> Result<DataFrame> {
    Ok(df
        .clone()
        .lazy()
        .filter(
            col("date")
                .gt_eq(lit(window.start))
                .and(col("date").lt_eq(lit(window.end))),
        )
        .collect()?)
}

/// Aggregate sums and derived ratios for one window of daily performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub orders: i64,
    pub new_orders: i64,
    pub new_customers: i64,
    pub total_revenue: f64,
    pub gross_profit: f64,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub attributed_revenue: f64,
    pub roas: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub cpo: f64,
    pub cac: f64,
}

impl PeriodSummary {
    /// Aggregate a daily-performance frame. Empty frames degrade to
    /// all-zero sums and zero-guarded ratios; they are never an error.
    pub fn from_daily(df: &DataFrame) -> Result<Self> {
        if df.height() == 0 {
            warn!("empty period window; aggregates degrade to zero");
            return Ok(Self::default());
        }
        let sums = df
            .clone()
            .lazy()
            .select([
                col("orders").sum(),
                col("new_orders").sum(),
                col("new_customers").sum(),
                col("total_revenue").sum(),
                col("gross_profit").sum(),
                col("spend").sum(),
                col("impressions").sum(),
                col("clicks").sum(),
                col("attributed_revenue").sum(),
            ])
            .collect()?;

        let float = |name: &str| -> Result<f64> {
            Ok(sums.column(name)?.f64()?.get(0).unwrap_or(0.0))
        };
        let int = |name: &str| -> Result<i64> {
            Ok(sums.column(name)?.i64()?.get(0).unwrap_or(0))
        };

        let mut summary = Self {
            orders: int("orders")?,
            new_orders: int("new_orders")?,
            new_customers: int("new_customers")?,
            total_revenue: float("total_revenue")?,
            gross_profit: float("gross_profit")?,
            spend: float("spend")?,
            impressions: int("impressions")?,
            clicks: int("clicks")?,
            attributed_revenue: float("attributed_revenue")?,
            ..Self::default()
        };
        summary.roas = metrics::ratio(summary.attributed_revenue, summary.spend);
        summary.cpc = metrics::ratio(summary.spend, summary.clicks as f64);
        summary.ctr = metrics::ratio(summary.clicks as f64, summary.impressions as f64) * 100.0;
        summary.cpo = metrics::ratio(summary.spend, summary.orders as f64);
        summary.cac = metrics::ratio(summary.spend, summary.new_customers as f64);
        Ok(summary)
    }
}

/// `current - previous` for each headline metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodDeltas {
    pub total_revenue: f64,
    pub gross_profit: f64,
    pub spend: f64,
    pub attributed_revenue: f64,
    pub roas: f64,
    pub cac: f64,
    pub cpo: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub orders: i64,
    pub new_customers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub window: DateWindow,
    pub previous_window: DateWindow,
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub deltas: PeriodDeltas,
}

/// Compare a window of daily performance against the immediately
/// preceding window of equal length.
pub fn compare_periods(daily: &DataFrame, window: DateWindow) -> Result<PeriodComparison> {
    let previous_window = window.preceding();
    let current = PeriodSummary::from_daily(&slice_window(daily, &window)?)?;
    let previous = PeriodSummary::from_daily(&slice_window(daily, &previous_window)?)?;
    let deltas = PeriodDeltas {
        total_revenue: current.total_revenue - previous.total_revenue,
        gross_profit: current.gross_profit - previous.gross_profit,
        spend: current.spend - previous.spend,
        attributed_revenue: current.attributed_revenue - previous.attributed_revenue,
        roas: current.roas - previous.roas,
        cac: current.cac - previous.cac,
        cpo: current.cpo - previous.cpo,
        cpc: current.cpc - previous.cpc,
        ctr: current.ctr - previous.ctr,
        orders: current.orders - previous.orders,
        new_customers: current.new_customers - previous.new_customers,
    };
    Ok(PeriodComparison {
        window,
        previous_window,
        current,
        previous,
        deltas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::with_row_metrics;
    use crate::normalize;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_fixture(dates: &[&str], spends: &[f64], revenues: &[f64]) -> DataFrame {
        let n = dates.len();
        let df = df![
            "date" => dates,
            "orders" => vec![10i64; n],
            "new_orders" => vec![4i64; n],
            "new_customers" => vec![2i64; n],
            "total_revenue" => vec![1000.0; n],
            "gross_profit" => vec![300.0; n],
            "spend" => spends,
            "impressions" => vec![1000i64; n],
            "clicks" => vec![50i64; n],
            "attributed_revenue" => revenues
        ]
        .unwrap();
        let df = normalize::ensure_date_column(df, "test").unwrap();
        with_row_metrics(df.lazy()).collect().unwrap()
    }

    #[test]
    fn preceding_window_is_equal_length_and_adjacent() {
        let window = DateWindow::new(date(2024, 2, 10), date(2024, 2, 16));
        let prev = window.preceding();
        assert_eq!(prev.duration_days(), window.duration_days());
        assert_eq!(prev.end, window.start - Duration::days(1));
        assert_eq!(prev.start, date(2024, 2, 3));
        // the gap between prev.end and window.start is exactly one day
        assert_eq!((window.start - prev.end).num_days(), 1);
    }

    #[test]
    fn single_day_window_precedes_by_one_day() {
        let window = DateWindow::new(date(2024, 3, 5), date(2024, 3, 5));
        let prev = window.preceding();
        assert_eq!(prev.start, date(2024, 3, 4));
        assert_eq!(prev.end, date(2024, 3, 4));
    }

    #[test]
    fn aggregate_roas_divides_sums_not_mean_of_row_ratios() {
        // rows: roas 4.0 and roas 1.0 with very different spend weights;
        // a mean-of-ratios implementation would report 2.5
        let daily = daily_fixture(
            &["2024-01-01", "2024-01-02"],
            &[100.0, 900.0],
            &[400.0, 900.0],
        );
        let summary = PeriodSummary::from_daily(&daily).unwrap();
        assert!((summary.roas - 1.3).abs() < 1e-12);
    }

    #[test]
    fn empty_previous_window_yields_zeroes_and_raw_deltas() {
        let daily = daily_fixture(&["2024-01-10", "2024-01-11"], &[100.0, 100.0], &[400.0, 200.0]);
        let comparison =
            compare_periods(&daily, DateWindow::new(date(2024, 1, 10), date(2024, 1, 11)))
                .unwrap();
        assert_eq!(comparison.previous, PeriodSummary::default());
        assert_eq!(comparison.deltas.spend, comparison.current.spend);
        assert_eq!(comparison.deltas.roas, comparison.current.roas);
        assert_eq!(comparison.current.total_revenue, 2000.0);
        assert!((comparison.current.roas - 3.0).abs() < 1e-12);
    }

    #[test]
    fn comparison_subtracts_previous_from_current() {
        let daily = daily_fixture(
            &["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"],
            &[50.0, 50.0, 100.0, 100.0],
            &[100.0, 100.0, 400.0, 400.0],
        );
        let comparison =
            compare_periods(&daily, DateWindow::new(date(2024, 1, 3), date(2024, 1, 4)))
                .unwrap();
        assert_eq!(comparison.previous_window.start, date(2024, 1, 1));
        assert_eq!(comparison.previous_window.end, date(2024, 1, 2));
        assert_eq!(comparison.current.spend, 200.0);
        assert_eq!(comparison.previous.spend, 100.0);
        assert_eq!(comparison.deltas.spend, 100.0);
        assert!((comparison.deltas.roas - 2.0).abs() < 1e-12);
    }
}
