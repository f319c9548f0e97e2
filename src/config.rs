use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DEFAULT_END_TIME_COLUMN, DEFAULT_START_TIME_COLUMN, DEFAULT_SYSTEM_COLUMN};
use crate::error::{AppError, AppResult};

pub const ENV_MAX_POINTS: &str = "PERFSERIES_MAX_POINTS";
pub const ENV_SCHEMA: &str = "PERFSERIES_SCHEMA";
pub const ENV_PRECISION: &str = "PERFSERIES_PRECISION";

/// Data source settings. Unspecified JSON keys fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSourceConfig {
    /// Upper bound on points per output series; minutes are grouped into
    /// wider buckets to stay under it.
    pub max_points_per_series: usize,
    /// Column carrying the row timestamp used for bucketing. It is also the
    /// window end a per-minute rate reads.
    pub time_column: String,
    /// Window start of a row, read by per-minute rates.
    pub start_time_column: String,
    /// Numeric system id of a row; providers filter on it.
    pub system_column: String,
    pub schema: Option<String>,
    /// Decimal places kept on floating results.
    pub precision: u32,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            max_points_per_series: 1440,
            time_column: DEFAULT_END_TIME_COLUMN.to_string(),
            start_time_column: DEFAULT_START_TIME_COLUMN.to_string(),
            system_column: DEFAULT_SYSTEM_COLUMN.to_string(),
            schema: None,
            precision: 3,
        }
    }
}

impl DataSourceConfig {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let cfg: DataSourceConfig =
            serde_json::from_str(json).map_err(|e| AppError::Config(format!("invalid data source config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Overlay environment overrides on top of this config.
    pub fn apply_env(self) -> AppResult<Self> {
        self.apply_overrides(|k| std::env::var(k).ok())
    }

    pub fn apply_overrides<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MAX_POINTS) {
            self.max_points_per_series = v
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{} must be a positive integer, got '{}'", ENV_MAX_POINTS, v)))?;
        }
        if let Some(v) = lookup(ENV_SCHEMA) {
            let v = v.trim();
            self.schema = if v.is_empty() { None } else { Some(v.to_string()) };
        }
        if let Some(v) = lookup(ENV_PRECISION) {
            self.precision = v
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", ENV_PRECISION, v)))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_points_per_series == 0 {
            return Err(AppError::Config("max_points_per_series must be at least 1".into()));
        }
        for (key, column) in [
            ("time_column", &self.time_column),
            ("start_time_column", &self.start_time_column),
            ("system_column", &self.system_column),
        ] {
            if column.trim().is_empty() {
                return Err(AppError::Config(format!("{} must be set", key)));
            }
        }
        if self.precision > 15 {
            return Err(AppError::Config("precision must be at most 15".into()));
        }
        Ok(())
    }
}
