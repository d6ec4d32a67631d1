// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document identifiers and ID generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, and `Borrow<str>` implementations. Serializes as the
/// bare string, so documents keep their flat JSON shape on the wire.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of a transfer request.
    pub struct RequestId;
}

define_id! {
    /// Identifier of a bundle.
    pub struct BundleId;
}

/// Mints identifiers for newly created documents.
///
/// The store owns a single minter behind an `Arc`, so implementations need
/// no interior cloning; a plain atomic is enough for the counting variant.
pub trait IdMinter: Send + Sync {
    fn mint(&self) -> String;
}

/// Production scheme: random v4 uuids.
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdMinter for RandomIds {
    fn mint(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `label-N` ids so test fixtures and assertions can name
/// documents up front.
#[derive(Debug)]
pub struct LabeledIds {
    label: &'static str,
    next: AtomicU64,
}

impl LabeledIds {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            next: AtomicU64::new(1),
        }
    }
}

impl IdMinter for LabeledIds {
    fn mint(&self) -> String {
        format!("{}-{}", self.label, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
