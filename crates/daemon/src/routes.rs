// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST routes for the coordinator.
//!
//! Route modules only translate HTTP to store operations; every rule that
//! matters (claim fencing, transitions, immutability) lives in the store so
//! it cannot be bypassed by a creative request.

use crate::auth::{self, AuthContext, Role};
use crate::error::ApiError;
use crate::AppState;
use axum::{middleware, Router};
use lta_storage::Fence;
use std::collections::HashSet;
use tower_http::trace::TraceLayer;

pub mod bundles;
pub mod metadata;
pub mod requests;
pub mod status;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(requests::router())
        .merge(bundles::router())
        .merge(metadata::router())
        .merge(status::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the mutation fence for a PATCH.
///
/// Workers must name themselves via `?claimant=`; an unfenced update is an
/// admin-only operation.
pub(crate) fn fence_for<'a>(
    ctx: &AuthContext,
    claimant: Option<&'a str>,
) -> Result<Fence<'a>, ApiError> {
    match claimant {
        Some(claimant) => Ok(Fence::Claimant(claimant)),
        None => {
            ctx.require(Role::Admin)?;
            Ok(Fence::Admin)
        }
    }
}

/// Strip a serialized document down to a caller-chosen field subset.
pub(crate) fn project(doc: serde_json::Value, fields: Option<&str>) -> serde_json::Value {
    let Some(fields) = fields else {
        return doc;
    };
    let keep: HashSet<&str> = fields.split(',').map(str::trim).collect();
    match doc {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(key, _)| keep.contains(key.as_str()))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
