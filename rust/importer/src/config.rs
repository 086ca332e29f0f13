// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Importer configuration.

use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tuning knobs for one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// Rows buffered per kind before a cascading flush.
    pub batch_size: usize,
    /// Reference resolver worker threads.
    pub xlink_workers: usize,
    /// Bounded resolver queue; producers block when it is full.
    pub xlink_queue_capacity: usize,
    /// Extra attempts for a reference that misses.
    pub xlink_max_retries: u32,
    /// Idle time after which a worker retries pending misses.
    pub xlink_retry_idle_ms: u64,
    /// Import appearances and register rings for texture coordinates.
    pub import_appearance: bool,
    /// Prefix of identifiers generated for unnamed geometry.
    pub id_prefix: String,
    /// SRID stamped on encoded geometry.
    pub srid: u32,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            xlink_workers: num_cpus::get(),
            xlink_queue_capacity: 10_000,
            xlink_max_retries: 3,
            xlink_retry_idle_ms: 5,
            import_appearance: true,
            id_prefix: "UUID_".into(),
            srid: 0,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ImporterConfig {
    /// Load configuration from `CITYDB_*` environment variables, falling
    /// back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_or("CITYDB_BATCH_SIZE", defaults.batch_size),
            xlink_workers: env_or("CITYDB_XLINK_WORKERS", defaults.xlink_workers),
            xlink_queue_capacity: env_or("CITYDB_XLINK_QUEUE_CAPACITY", defaults.xlink_queue_capacity),
            xlink_max_retries: env_or("CITYDB_XLINK_MAX_RETRIES", defaults.xlink_max_retries),
            xlink_retry_idle_ms: env_or("CITYDB_XLINK_RETRY_IDLE_MS", defaults.xlink_retry_idle_ms),
            import_appearance: env_or("CITYDB_IMPORT_APPEARANCE", defaults.import_appearance),
            id_prefix: std::env::var("CITYDB_ID_PREFIX").unwrap_or(defaults.id_prefix),
            srid: env_or("CITYDB_SRID", defaults.srid),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ImportError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.xlink_workers == 0 {
            return Err(ImportError::InvalidConfig("xlink_workers must be at least 1".into()));
        }
        if self.xlink_queue_capacity == 0 {
            return Err(ImportError::InvalidConfig(
                "xlink_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
