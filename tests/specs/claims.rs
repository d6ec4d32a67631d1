//! Scenario: claim loss during a long-running action.

use crate::prelude::*;
use axum::http::StatusCode;
use serde_json::json;

async fn specified_bundle(c: &Coordinator) -> String {
    let request = new_request(c, "WIPAC", "NERSC", "/data/exp").await;
    let (_, created) = send(
        c,
        "POST",
        "/Bundles/actions/bulk_create",
        &["system"],
        Some(json!({
            "bundles": [{
                "request": request,
                "source": "WIPAC",
                "dest": "NERSC",
                "path": "/data/exp",
                "status": "specified",
            }]
        })),
    )
    .await;
    created["bundles"][0]["uuid"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn reaper_frees_an_expired_claim_and_fencing_rejects_the_loser() {
    let c = coordinator();
    let uuid = specified_bundle(&c).await;

    // Worker one claims and then goes dark.
    let popped = pop_bundle(&c, "specified", "bundler-01").await;
    assert_eq!(popped["uuid"].as_str().unwrap(), uuid);

    // MAX_CLAIM_AGE elapses; the reaper releases the claim.
    c.clock.advance(chrono::Duration::hours(13));
    let released = c.store.release_stale_claims(chrono::Duration::hours(12));
    assert_eq!(released, vec![uuid.clone()]);

    // Worker two claims and completes the work.
    let reclaimed = pop_bundle(&c, "specified", "bundler-02").await;
    assert_eq!(reclaimed["uuid"].as_str().unwrap(), uuid);
    assert_eq!(reclaimed["claimant"], "bundler-02");

    let (status, _) = advance_bundle(&c, &uuid, "bundler-02", "created", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Worker one wakes up and reports late; its PATCH must lose.
    let (status, body) = advance_bundle(&c, &uuid, "bundler-01", "created", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("conflict") || body["error"]
        .as_str()
        .unwrap()
        .contains("invalid transition"));
}

#[tokio::test]
async fn fresh_claims_survive_the_reaper() {
    let c = coordinator();
    let uuid = specified_bundle(&c).await;
    pop_bundle(&c, "specified", "bundler-01").await;

    c.clock.advance(chrono::Duration::hours(1));
    assert!(c
        .store
        .release_stale_claims(chrono::Duration::hours(12))
        .is_empty());

    // Still exclusively held.
    assert_eq!(
        pop_bundle(&c, "specified", "bundler-02").await,
        serde_json::Value::Null
    );
    let _ = uuid;
}

#[tokio::test]
async fn concurrent_claimants_get_distinct_bundles() {
    let c = coordinator();
    let request = new_request(&c, "WIPAC", "NERSC", "/data/exp").await;
    let (_, created) = send(
        &c,
        "POST",
        "/Bundles/actions/bulk_create",
        &["system"],
        Some(json!({
            "bundles": (0..3).map(|_| json!({
                "request": request,
                "source": "WIPAC",
                "dest": "NERSC",
                "path": "/data/exp",
                "status": "specified",
            })).collect::<Vec<_>>()
        })),
    )
    .await;
    assert_eq!(created["bundles"].as_array().unwrap().len(), 3);

    let mut wins = std::collections::HashSet::new();
    for worker in ["bundler-01", "bundler-02", "bundler-03", "bundler-04"] {
        let popped = pop_bundle(&c, "specified", worker).await;
        if let Some(uuid) = popped["uuid"].as_str() {
            assert!(wins.insert(uuid.to_string()), "duplicate claim for {uuid}");
        }
    }
    // Exactly min(workers, bundles) wins.
    assert_eq!(wins.len(), 3);
}
