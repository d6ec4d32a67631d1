// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, assembled from the environment at startup and
//! immutable afterwards. A missing required variable is a fatal error.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// HS256 secret for bearer-token validation.
    pub auth_secret: String,
    /// Required token audience.
    pub auth_audience: String,
    /// Directory holding the snapshot.
    pub state_dir: PathBuf,
    /// Claims older than this are reaped.
    pub max_claim_age: chrono::Duration,
    /// How often the reaper scans.
    pub reaper_interval: Duration,
    /// How often the checkpoint task snapshots.
    pub checkpoint_interval: Duration,
    /// Default tracing filter (`LOG_LEVEL`).
    pub log_level: String,
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load from an explicit variable map (tests).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_or(vars, "LTA_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let auth_secret = vars
            .get("LTA_AUTH_SECRET")
            .filter(|s| !s.is_empty())
            .cloned()
            .ok_or(ConfigError::Missing("LTA_AUTH_SECRET"))?;
        let auth_audience = vars
            .get("LTA_AUTH_AUDIENCE")
            .cloned()
            .unwrap_or_else(|| "long-term-archive".to_string());
        let state_dir = vars
            .get("LTA_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./lta-state"));
        let max_claim_age_hours: i64 = parse_or(vars, "MAX_CLAIM_AGE_HOURS", 12)?;
        let reaper_secs: u64 = parse_or(vars, "REAPER_SLEEP_DURATION_SECONDS", 60)?;
        let checkpoint_secs: u64 = parse_or(vars, "CHECKPOINT_INTERVAL_SECONDS", 60)?;
        let log_level = vars
            .get("LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            bind_addr,
            auth_secret,
            auth_audience,
            state_dir,
            max_claim_age: chrono::Duration::hours(max_claim_age_hours),
            reaper_interval: Duration::from_secs(reaper_secs),
            checkpoint_interval: Duration::from_secs(checkpoint_secs),
            log_level,
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir.join("snapshot.zst")
    }
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
