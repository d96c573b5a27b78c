//! Configuration loading and representation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::RetryPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Background job windows and cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// In-progress or paused orders older than this are cancelled.
    pub auto_cancel_after_days: u32,
    /// Panel line items of orders completed longer ago than this are purged.
    pub purge_after_days: u32,
    pub interval_secs: u64,
    /// Applied to each whole job run.
    pub retry: RetryPolicy,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            auto_cancel_after_days: 30,
            purge_after_days: 3,
            interval_secs: 3600,
            retry: RetryPolicy::exponential(3, Duration::from_secs(1), Duration::from_secs(30)),
        }
    }
}

impl HousekeepingConfig {
    pub fn auto_cancel_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.auto_cancel_after_days as i64)
    }

    pub fn purge_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.purge_after_days as i64)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Postgres URL; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub lock_timeout_ms: u64,
    /// Retries of a whole transaction after a lock timeout, deadlock or serialization
    /// failure.
    pub max_conflict_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            lock_timeout_ms: 5_000,
            max_conflict_retries: 3,
        }
    }
}

impl StoreConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Policy for retrying transactions that hit transient conflicts.
    pub fn conflict_retry(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_conflict_retries,
            Duration::from_millis(20),
            Duration::from_millis(500),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelstockConfig {
    pub housekeeping: HousekeepingConfig,
    pub store: StoreConfig,
}

impl PanelstockConfig {
    /// Load from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.store.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        override_parsed(&lookup, "PANELSTOCK_AUTO_CANCEL_DAYS", &mut config.housekeeping.auto_cancel_after_days)?;
        override_parsed(&lookup, "PANELSTOCK_PURGE_DAYS", &mut config.housekeeping.purge_after_days)?;
        override_parsed(&lookup, "PANELSTOCK_HOUSEKEEPING_INTERVAL_SECS", &mut config.housekeeping.interval_secs)?;
        override_parsed(&lookup, "PANELSTOCK_LOCK_TIMEOUT_MS", &mut config.store.lock_timeout_ms)?;
        override_parsed(&lookup, "PANELSTOCK_MAX_CONFLICT_RETRIES", &mut config.store.max_conflict_retries)?;

        if config.housekeeping.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "PANELSTOCK_HOUSEKEEPING_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "interval must be at least one second".to_string(),
            });
        }
        Ok(config)
    }
}

fn override_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    target: &mut T,
) -> Result<(), ConfigError>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => {
            *target = raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }
        None => debug!(var, default = %target, "using default"),
    }
    Ok(())
}
