//! Scenario: admin priority reset changes POP order.

use crate::prelude::*;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn resetting_work_priority_demotes_an_older_request() {
    let c = coordinator();

    // A is older than B.
    let a = new_request(&c, "WIPAC", "NERSC", "/data/exp/a").await;
    c.clock.advance(chrono::Duration::minutes(5));
    let b = new_request(&c, "WIPAC", "NERSC", "/data/exp/b").await;

    // Admin re-stamps A's priority to be newer than B's.
    let (status, _) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{a}"),
        &["admin"],
        Some(json!({ "work_priority_timestamp": "2026-01-15T13:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The picker now gets B first, then A.
    let (_, first) = send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?claimant=picker-01",
        &["system"],
        None,
    )
    .await;
    assert_eq!(first["uuid"].as_str().unwrap(), b);

    let (_, second) = send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?claimant=picker-01",
        &["system"],
        None,
    )
    .await;
    assert_eq!(second["uuid"].as_str().unwrap(), a);
}

#[tokio::test]
async fn default_order_is_oldest_first() {
    let c = coordinator();
    let a = new_request(&c, "WIPAC", "NERSC", "/data/exp/a").await;
    c.clock.advance(chrono::Duration::minutes(5));
    let _b = new_request(&c, "WIPAC", "NERSC", "/data/exp/b").await;

    let (_, first) = send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?claimant=picker-01",
        &["system"],
        None,
    )
    .await;
    assert_eq!(first["uuid"].as_str().unwrap(), a);
}
