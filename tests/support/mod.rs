//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use discover::Attributes;
use discover::DiscoverClient;
use discover::InMemoryBackend;

pub const NAME: &str = "foo";
pub const IP: &str = "127.0.0.1";

/// Attribute map from string pairs.
pub fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Fresh backend plus a client with default settings.
pub fn new_client() -> (Arc<InMemoryBackend>, DiscoverClient) {
    discover::logging::init_with_default("warn");
    let backend = InMemoryBackend::new();
    let client = DiscoverClient::new(backend.clone()).expect("default config is valid");
    (backend, client)
}
