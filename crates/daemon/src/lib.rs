// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lta-daemon: the coordinator REST service (`ltad`).
//!
//! The daemon is the sole authority over transfer-request, bundle, metadata,
//! and heartbeat state. Workers talk to it over HTTP+JSON with bearer
//! tokens; two background tasks (stale-claim reaper, snapshot checkpointer)
//! run alongside the listener.

pub mod auth;
pub mod config;
pub mod error;
pub mod reaper;
pub mod routes;

use lta_storage::Store;
use std::sync::Arc;

pub use auth::{AuthConfig, AuthContext, Role};
pub use config::{Config, ConfigError};
pub use error::ApiError;

/// Shared state behind every route handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(store: Store, auth: AuthConfig) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
        }
    }
}

/// Build the coordinator router with auth and request tracing applied.
pub fn router(state: AppState) -> axum::Router {
    routes::router(state)
}
