//! Run configuration.
//!
//! Every field has a default, so a JSON config file only needs the values it
//! changes:
//!
//! ```json
//! { "sleep_sec": 2.5, "window": { "last": 100 }, "columns": { "city": "City" } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use phone_enrich_cache::{CachePolicy, LookupCache};
use phone_enrich_lookup::{BackoffPolicy, LookupSettings, Pacer};
use phone_enrich_match::ScoringConfig;
use serde::{Deserialize, Serialize};

use crate::{EnrichError, Result};

pub const DEFAULT_CACHE_PATH: &str = "data/cache/people_lookup_cache.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub cache_path: PathBuf,
    /// Delay before each live fetch.
    pub sleep_sec: f64,
    /// Uniform random extra delay on top of `sleep_sec`.
    pub jitter_sec: f64,
    /// Ignore cached entries (still writes fresh ones).
    pub refresh: bool,
    /// Re-fetch identities whose cached outcome is an error from a previous run.
    pub retry_errors: bool,
    /// Cached entries older than this are re-fetched.
    pub max_age_days: Option<u32>,
    /// Cache puts between flushes.
    pub flush_every: usize,
    pub window: WindowConfig,
    pub columns: ColumnMap,
    pub scoring: ScoringConfig,
    pub lookup: LookupSettings,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            sleep_sec: 1.0,
            jitter_sec: 0.0,
            refresh: false,
            retry_errors: false,
            max_age_days: None,
            flush_every: 1,
            window: WindowConfig::default(),
            columns: ColumnMap::default(),
            scoring: ScoringConfig::default(),
            lookup: LookupSettings::default(),
        }
    }
}

/// Row selectors. At most one of `from_row`/`to_row`, `limit` and `last` may
/// be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// 1-based, inclusive.
    pub from_row: Option<usize>,
    /// 1-based, inclusive.
    pub to_row: Option<usize>,
    /// First N rows.
    pub limit: Option<usize>,
    /// Last N rows.
    pub last: Option<usize>,
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        let mut selected = Vec::new();
        if self.from_row.is_some() || self.to_row.is_some() {
            selected.push("from_row/to_row");
        }
        if self.limit.is_some() {
            selected.push("limit");
        }
        if self.last.is_some() {
            selected.push("last");
        }
        if selected.len() > 1 {
            return Err(EnrichError::Config(format!(
                "window selectors are mutually exclusive, got {}",
                selected.join(" + ")
            )));
        }
        for (name, value) in [
            ("from_row", self.from_row),
            ("to_row", self.to_row),
            ("limit", self.limit),
            ("last", self.last),
        ] {
            if value == Some(0) {
                return Err(EnrichError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

/// Input column names. City and state fall back to the address column and
/// then to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub unit: Option<String>,
    pub default_city: String,
    pub default_state: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            address: "Address".to_string(),
            city: None,
            state: None,
            unit: None,
            default_city: "Miami".to_string(),
            default_state: "FL".to_string(),
        }
    }
}

impl EnrichConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            EnrichError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            EnrichError::Config(format!("failed to parse config {}: {e}", path.display()))
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("sleep_sec", self.sleep_sec), ("jitter_sec", self.jitter_sec)] {
            if !value.is_finite() || value < 0.0 {
                return Err(EnrichError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let s = &self.scoring;
        if !(s.name_weight >= 0.0 && s.address_weight >= 0.0)
            || !(s.name_weight + s.address_weight > 0.0)
        {
            return Err(EnrichError::Config(
                "scoring weights must be non-negative with a positive sum".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&s.min_score) {
            return Err(EnrichError::Config(format!(
                "scoring.min_score must be within [0, 1], got {}",
                s.min_score
            )));
        }
        if s.max_phones == 0 || s.max_phones > 4 {
            return Err(EnrichError::Config(format!(
                "scoring.max_phones must be between 1 and 4, got {}",
                s.max_phones
            )));
        }
        if s.phones_per_candidate == 0 {
            return Err(EnrichError::Config(
                "scoring.phones_per_candidate must be at least 1".to_string(),
            ));
        }

        let l = &self.lookup;
        if l.max_attempts == 0 {
            return Err(EnrichError::Config(
                "lookup.max_attempts must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("lookup.backoff_base_sec", l.backoff_base_sec),
            ("lookup.backoff_max_sec", l.backoff_max_sec),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EnrichError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if self.columns.name.trim().is_empty() || self.columns.address.trim().is_empty() {
            return Err(EnrichError::Config(
                "columns.name and columns.address must be set".to_string(),
            ));
        }

        self.window.validate()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            max_age: self
                .max_age_days
                .map(|days| chrono::Duration::days(i64::from(days))),
            retry_errors: self.retry_errors,
        }
    }

    /// Open the configured cache with this run's policy and flush window.
    pub fn open_cache(&self) -> Result<LookupCache> {
        let cache = LookupCache::open(&self.cache_path).map_err(|source| EnrichError::Cache {
            row: None,
            key: None,
            source,
        })?;
        Ok(cache
            .with_policy(self.cache_policy())
            .with_flush_every(self.flush_every))
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::from_secs_f64(self.sleep_sec, self.jitter_sec)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.lookup.max_attempts,
            base: seconds(self.lookup.backoff_base_sec),
            max: seconds(self.lookup.backoff_max_sec),
        }
    }
}

/// Negative and non-finite values count as zero.
fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: EnrichConfig = serde_json::from_str(
            r#"{ "sleep_sec": 2.5, "window": { "last": 100 }, "columns": { "city": "City" } }"#,
        )
        .expect("parse");
        assert_eq!(cfg.sleep_sec, 2.5);
        assert_eq!(cfg.window.last, Some(100));
        assert_eq!(cfg.columns.city.as_deref(), Some("City"));
        assert_eq!(cfg.columns.name, "Name");
        assert_eq!(cfg.scoring.max_phones, 4);
        assert_eq!(cfg.cache_path, PathBuf::from(DEFAULT_CACHE_PATH));
        cfg.validate().expect("valid");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_sleep = EnrichConfig {
            sleep_sec: -1.0,
            ..Default::default()
        };
        assert!(matches!(bad_sleep.validate(), Err(EnrichError::Config(_))));

        let mut bad_weights = EnrichConfig::default();
        bad_weights.scoring.name_weight = 0.0;
        bad_weights.scoring.address_weight = 0.0;
        assert!(bad_weights.validate().is_err());

        let mut no_attempts = EnrichConfig::default();
        no_attempts.lookup.max_attempts = 0;
        assert!(no_attempts.validate().is_err());

        let mut zero_limit = EnrichConfig::default();
        zero_limit.window.limit = Some(0);
        assert!(zero_limit.validate().is_err());
    }

    #[test]
    fn limit_and_last_together_is_config_error() {
        let mut cfg = EnrichConfig::default();
        cfg.window.limit = Some(5);
        cfg.window.last = Some(5);
        let err = cfg.validate().expect_err("exclusive");
        assert!(err.to_string().contains("limit + last"));
    }

    #[test]
    fn derived_policies() {
        let cfg = EnrichConfig {
            max_age_days: Some(30),
            retry_errors: true,
            ..Default::default()
        };
        let policy = cfg.cache_policy();
        assert_eq!(policy.max_age, Some(chrono::Duration::days(30)));
        assert!(policy.retry_errors);
        assert_eq!(cfg.backoff().max_attempts, 3);
        assert_eq!(cfg.backoff().base, Duration::from_secs(2));
    }
}
