// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn define_id_new_and_as_str() {
    let id = BundleId::new("abc");
    assert_eq!(id.as_str(), "abc");
}

#[test]
fn define_id_display() {
    let id = RequestId::new("hello");
    assert_eq!(id.to_string(), "hello");
}

#[test]
fn define_id_partial_eq_str() {
    let id = BundleId::new("test");
    assert_eq!(id, "test");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(BundleId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
}

#[test]
fn define_id_serializes_as_bare_string() {
    let id = BundleId::new("b-1");
    assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("b-1"));
}

#[test]
fn random_ids_are_distinct() {
    let ids = RandomIds;
    assert_ne!(ids.mint(), ids.mint());
}

#[test]
fn labeled_ids_count_up_under_their_label() {
    let ids = LabeledIds::new("bundle");
    assert_eq!(ids.mint(), "bundle-1");
    assert_eq!(ids.mint(), "bundle-2");

    // Separate minters keep separate counters, so request and bundle
    // fixtures stay distinguishable.
    let other = LabeledIds::new("request");
    assert_eq!(other.mint(), "request-1");
}
