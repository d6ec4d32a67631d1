// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration: the common environment table every stage reads.
//!
//! Assembled once at startup and immutable afterwards. Any missing required
//! variable is a distinct fatal error so operators see exactly what to fix.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(String),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: String, value: String },
}

/// Termination mode of the work loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exit after a single claim attempt.
    OnceAndDie,
    /// Exit the first time POP comes back empty.
    UntilNoWork,
    /// Loop forever, sleeping between cycles.
    Perpetual,
}

/// Configuration shared by every worker type.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identity used for claims and heartbeats (`COMPONENT_NAME`).
    pub component_name: String,
    pub source_site: String,
    pub dest_site: String,
    /// Status this stage claims (`INPUT_STATUS`). Raw string; stages that
    /// pop transfer requests ignore it.
    pub input_status: String,
    /// Status this stage advances to (`OUTPUT_STATUS`).
    pub output_status: String,
    pub lta_rest_url: String,
    pub lta_auth_openid_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub work_sleep: Duration,
    pub work_retries: u32,
    pub work_timeout: Duration,
    pub heartbeat_sleep: Duration,
    pub heartbeat_patch_retries: u32,
    pub heartbeat_patch_timeout: Duration,
    pub termination: Termination,
    pub log_level: String,
    pub prometheus_metrics_port: Option<u16>,
    /// The full variable map, so stages can read their own keys
    /// (`BUNDLER_OUTBOX_PATH`, `GRIDFTP_DEST_URL`, ...).
    vars: HashMap<String, String>,
}

impl WorkerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load from an explicit variable map (tests).
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |name: &str| -> Result<String, ConfigError> {
            vars.get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| ConfigError::Missing(name.to_string()))
        };

        let termination = match (
            parse_bool(&vars, "RUN_ONCE_AND_DIE")?,
            parse_bool(&vars, "RUN_UNTIL_NO_WORK")?,
        ) {
            (true, _) => Termination::OnceAndDie,
            (false, true) => Termination::UntilNoWork,
            (false, false) => Termination::Perpetual,
        };

        Ok(Self {
            component_name: required("COMPONENT_NAME")?,
            source_site: required("SOURCE_SITE")?,
            dest_site: required("DEST_SITE")?,
            input_status: required("INPUT_STATUS")?,
            output_status: required("OUTPUT_STATUS")?,
            lta_rest_url: required("LTA_REST_URL")?,
            lta_auth_openid_url: required("LTA_AUTH_OPENID_URL")?,
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            work_sleep: Duration::from_secs(parse_num(&vars, "WORK_SLEEP_DURATION_SECONDS", 60)?),
            work_retries: parse_num(&vars, "WORK_RETRIES", 3)? as u32,
            work_timeout: Duration::from_secs(parse_num(&vars, "WORK_TIMEOUT_SECONDS", 30)?),
            heartbeat_sleep: Duration::from_secs(parse_num(
                &vars,
                "HEARTBEAT_SLEEP_DURATION_SECONDS",
                60,
            )?),
            heartbeat_patch_retries: parse_num(&vars, "HEARTBEAT_PATCH_RETRIES", 3)? as u32,
            heartbeat_patch_timeout: Duration::from_secs(parse_num(
                &vars,
                "HEARTBEAT_PATCH_TIMEOUT_SECONDS",
                10,
            )?),
            termination,
            log_level: vars
                .get("LOG_LEVEL")
                .cloned()
                .unwrap_or_else(|| "info".to_string()),
            prometheus_metrics_port: match vars.get("PROMETHEUS_METRICS_PORT") {
                None => None,
                Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    name: "PROMETHEUS_METRICS_PORT".to_string(),
                    value: raw.clone(),
                })?),
            },
            vars,
        })
    }

    /// A required stage-specific variable.
    pub fn var(&self, name: &str) -> Result<&str, ConfigError> {
        self.vars
            .get(name)
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    /// An optional stage-specific variable.
    pub fn var_opt(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// A numeric stage-specific variable with a default.
    pub fn var_num(&self, name: &str, default: u64) -> Result<u64, ConfigError> {
        match self.vars.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: name.to_string(),
                value: raw.clone(),
            }),
        }
    }
}

fn parse_num(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value: raw.clone(),
        }),
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(String::as_str) {
        None | Some("") | Some("FALSE") | Some("false") | Some("0") => Ok(false),
        Some("TRUE") | Some("true") | Some("1") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
