//! Shared harness for the behavioral specs: an in-process coordinator with
//! a fake clock, plus request helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use lta_core::{FakeClock, LabeledIds};
use lta_daemon::{auth::AuthConfig, AppState};
use lta_storage::Store;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "spec-secret";

pub struct Coordinator {
    pub app: axum::Router,
    pub store: Store,
    pub clock: FakeClock,
}

pub fn coordinator() -> Coordinator {
    let clock = FakeClock::at(chrono::Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
    let store = Store::with_parts(
        Arc::new(clock.clone()),
        Arc::new(LabeledIds::new("doc")),
    );
    let state = AppState::new(
        store.clone(),
        AuthConfig {
            secret: SECRET.to_string(),
            audience: "long-term-archive".to_string(),
        },
    );
    Coordinator {
        app: lta_daemon::router(state),
        store,
        clock,
    }
}

pub fn token(roles: &[&str]) -> String {
    let claims = lta_daemon::auth::TokenClaims {
        sub: "spec".to_string(),
        aud: "long-term-archive".to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        roles: roles.iter().map(|r| r.to_string()).collect(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn send(
    coordinator: &Coordinator,
    method: &str,
    uri: &str,
    roles: &[&str],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(roles)));
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = coordinator.app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create a transfer request and return its uuid.
pub async fn new_request(coordinator: &Coordinator, source: &str, dest: &str, path: &str) -> String {
    let (status, created) = send(
        coordinator,
        "POST",
        "/TransferRequests",
        &["system"],
        Some(json!({ "source": source, "dest": dest, "path": path })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    created["uuid"].as_str().unwrap().to_string()
}

/// POP one bundle as `claimant`, returning its document (or Null).
pub async fn pop_bundle(coordinator: &Coordinator, status: &str, claimant: &str) -> Value {
    let (code, body) = send(
        coordinator,
        "POST",
        &format!("/Bundles/actions/pop?status={status}&claimant={claimant}"),
        &["system"],
        None,
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    body
}

/// Advance a claimed bundle to `next_status`, releasing the claim.
pub async fn advance_bundle(
    coordinator: &Coordinator,
    uuid: &str,
    claimant: &str,
    next_status: &str,
    extra: Value,
) -> (StatusCode, Value) {
    let mut body = json!({ "status": next_status, "claimed": false });
    if let (Some(target), Some(source)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    send(
        coordinator,
        "PATCH",
        &format!("/Bundles/{uuid}?claimant={claimant}"),
        &["system"],
        Some(body),
    )
    .await
}
