//! Source registry configuration.
//!
//! Every raw source is described by data, not code: ad sources carry a
//! platform tag, a file path, and an explicit rename table mapping raw
//! column labels to canonical field names. Adding a platform is a matter
//! of adding a config entry.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Mapping from raw column label to canonical field name.
///
/// Keys are matched after label canonicalization, so entries may be
/// written in raw form (`# of orders`) or canonical form (`#_of_orders`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameTable(pub BTreeMap<String, String>);

impl RenameTable {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Rename map shared by the stock ad platforms.
    pub fn ad_default() -> Self {
        Self::from_pairs(&[
            ("impression", "impressions"),
            ("attributed revenue", "attributed_revenue"),
        ])
    }

    /// Rename map for the business-outcomes source.
    pub fn business_default() -> Self {
        Self::from_pairs(&[
            ("# of orders", "orders"),
            ("# of new orders", "new_orders"),
            ("new customers", "new_customers"),
            ("total revenue", "total_revenue"),
            ("gross profit", "gross_profit"),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One per-platform advertising source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSourceSpec {
    pub platform: String,
    pub path: PathBuf,
    #[serde(default = "RenameTable::ad_default")]
    pub renames: RenameTable,
}

/// The business-outcomes source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSourceSpec {
    pub path: PathBuf,
    #[serde(default = "RenameTable::business_default")]
    pub renames: RenameTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub ad_sources: Vec<AdSourceSpec>,
    pub business: BusinessSourceSpec,
}

impl SourceConfig {
    /// The stock four-file layout: three ad platforms plus the business
    /// outcomes file, all in `dir`.
    pub fn default_for(dir: &Path) -> Self {
        let ad = |platform: &str, file: &str| AdSourceSpec {
            platform: platform.to_string(),
            path: dir.join(file),
            renames: RenameTable::ad_default(),
        };
        Self {
            ad_sources: vec![
                ad("Facebook", "Facebook.csv"),
                ad("Google", "Google.csv"),
                ad("TikTok", "TikTok.csv"),
            ],
            business: BusinessSourceSpec {
                path: dir.join("Business.csv"),
                renames: RenameTable::business_default(),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SourceConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("failed to parse source config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ad_sources.is_empty() {
            return Err(EngineError::Config(
                "at least one ad source is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for spec in &self.ad_sources {
            if spec.platform.trim().is_empty() {
                return Err(EngineError::Config(
                    "ad source platform tag must not be empty".to_string(),
                ));
            }
            if !seen.insert(spec.platform.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate platform tag '{}'",
                    spec.platform
                )));
            }
        }
        Ok(())
    }

    /// Every file the config points at, ad sources first.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.ad_sources.iter().map(|s| s.path.clone()).collect();
        paths.push(self.business.path.clone());
        paths
    }
}
