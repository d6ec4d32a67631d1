// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token validation and role-based authorization.
//!
//! Tokens are HS256 JWTs with the `long-term-archive` audience. The
//! middleware validates once per request and stashes an [`AuthContext`] in
//! request extensions; handlers enforce the role they need.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Access scopes, in increasing order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// GETs only.
    Read,
    /// Worker operations: pop, patch, bulk create/delete, heartbeat.
    System,
    /// Everything, including document deletion.
    Admin,
}

/// Validation parameters, shared by all requests.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub audience: String,
}

/// Claims carried by a coordinator token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
    pub role: Role,
}

impl AuthContext {
    /// Error unless the caller holds at least `role`.
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role >= role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{} scope required",
                match role {
                    Role::Read => "read",
                    Role::System => "system",
                    Role::Admin => "admin",
                }
            )))
        }
    }
}

/// Validate a bearer token into an [`AuthContext`].
pub fn authenticate(config: &AuthConfig, token: &str) -> Result<AuthContext, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&config.audience]);

    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let role = if data.claims.roles.iter().any(|r| r == "admin") {
        Role::Admin
    } else if data.claims.roles.iter().any(|r| r == "system") {
        Role::System
    } else {
        Role::Read
    };

    Ok(AuthContext {
        subject: data.claims.sub,
        role,
    })
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware: reject unauthenticated requests, inject [`AuthContext`].
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    let ctx = authenticate(&state.auth, token)?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
