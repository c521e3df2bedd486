//! Dataset assembly, filtering, and memoization.
//!
//! A load runs the whole reconciliation pipeline (normalize, combine,
//! aggregate, join, derive) and the result is immutable: every filter
//! call hands back a fresh frame. Loads are all-or-nothing; a structural
//! failure in any source aborts without a partial dataset.

use crate::combine;
use crate::config::{RenameTable, SourceConfig};
use crate::daily::{self, DuplicateDate};
use crate::error::Result;
use crate::ingest;
use crate::metrics;
use crate::period::{slice_window, DateWindow};
use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// The reconciled marketing dataset: the joined daily-performance table
/// plus the unified ad-level table it was derived from.
pub struct Dataset {
    daily: DataFrame,
    ads: DataFrame,
    duplicate_dates: Vec<DuplicateDate>,
}

impl Dataset {
    /// Load every configured source from disk and reconcile.
    pub fn load(config: &SourceConfig) -> Result<Self> {
        config.validate()?;
        let mut sources = Vec::with_capacity(config.ad_sources.len());
        for spec in &config.ad_sources {
            sources.push((spec.platform.clone(), ingest::load_ad_source(spec)?));
        }
        let business = ingest::load_business(&config.business)?;
        Self::from_normalized(business, sources)
    }

    /// Build a dataset from in-memory raw frames using the stock rename
    /// tables. Column labels may still be raw; dates may still be strings.
    pub fn from_sources(
        business: DataFrame,
        ad_sources: Vec<(String, DataFrame)>,
    ) -> Result<Self> {
        let mut sources = Vec::with_capacity(ad_sources.len());
        for (platform, raw) in ad_sources {
            let df = ingest::conform_ad_frame(&raw, &platform, &RenameTable::ad_default())?;
            sources.push((platform, df));
        }
        let business =
            ingest::conform_business_frame(&business, &RenameTable::business_default())?;
        Self::from_normalized(business, sources)
    }

    fn from_normalized(business: DataFrame, sources: Vec<(String, DataFrame)>) -> Result<Self> {
        let duplicate_dates = daily::detect_duplicate_dates(&business)?;
        let ads = combine::combine_sources(&sources)?;
        let daily_ads = daily::aggregate_daily(&ads)?;
        let joined = daily::join_business(&business, &daily_ads)?;
        let daily = metrics::with_row_metrics(joined.lazy()).collect()?;
        info!(
            "dataset ready: {} day(s), {} ad row(s)",
            daily.height(),
            ads.height()
        );
        Ok(Self {
            daily,
            ads,
            duplicate_dates,
        })
    }

    /// The joined daily-performance table with per-row derived metrics.
    pub fn daily(&self) -> &DataFrame {
        &self.daily
    }

    /// The unified ad-level table.
    pub fn ads(&self) -> &DataFrame {
        &self.ads
    }

    /// Business dates that appeared more than once in the source.
    pub fn duplicate_dates(&self) -> &[DuplicateDate] {
        &self.duplicate_dates
    }

    /// Overall span of the daily table, if it has any rows.
    pub fn date_span(&self) -> Option<DateWindow> {
        let dates = self.daily.column("date").ok()?.date().ok()?;
        Some(DateWindow::new(
            daily::date_from_epoch_days(dates.min()?),
            daily::date_from_epoch_days(dates.max()?),
        ))
    }

    /// Daily rows inside the window.
    pub fn daily_between(&self, window: &DateWindow) -> Result<DataFrame> {
        slice_window(&self.daily, window)
    }

    /// Ad rows inside the window, optionally narrowed to one platform.
    pub fn ads_between(&self, window: &DateWindow, platform: Option<&str>) -> Result<DataFrame> {
        let mut lf = self.ads.clone().lazy().filter(
            col("date")
                .gt_eq(lit(window.start))
                .and(col("date").lt_eq(lit(window.end))),
        );
        if let Some(platform) = platform {
            lf = lf.filter(col("platform").eq(lit(platform)));
        }
        let out = lf.collect()?;
        if out.height() == 0 {
            warn!(
                "ad filter returned no rows (window {} .. {}, platform {:?})",
                window.start, window.end, platform
            );
        }
        Ok(out)
    }
}

/// Identity of the raw inputs: (path, length, mtime) per source file.
/// Equal fingerprints mean an identical recomputation, so a cached
/// dataset can be reused; no wall-clock or call-count heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint(Vec<(PathBuf, u64, SystemTime)>);

impl SourceFingerprint {
    pub fn capture(config: &SourceConfig) -> Result<Self> {
        let mut parts = Vec::new();
        for path in config.source_paths() {
            let meta = std::fs::metadata(&path)?;
            parts.push((path, meta.len(), meta.modified()?));
        }
        Ok(Self(parts))
    }
}

/// Memoizes the loaded dataset keyed by the source fingerprint.
#[derive(Default)]
pub struct DatasetCache {
    entry: Option<(SourceFingerprint, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset when the sources are unchanged,
    /// otherwise reload and replace the entry.
    pub fn load(&mut self, config: &SourceConfig) -> Result<Arc<Dataset>> {
        let fingerprint = SourceFingerprint::capture(config)?;
        if let Some((cached, dataset)) = &self.entry {
            if *cached == fingerprint {
                debug!("source fingerprint unchanged; reusing cached dataset");
                return Ok(Arc::clone(dataset));
            }
        }
        let dataset = Arc::new(Dataset::load(config)?);
        self.entry = Some((fingerprint, Arc::clone(&dataset)));
        Ok(dataset)
    }
}
