//! Per-URL `GatewayClient` cache. Entries are safe to share across
//! threads because the underlying channel is multiplexable.

use crate::client::GatewayClient;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

static CACHE: Lazy<DashMap<String, Arc<GatewayClient>>> = Lazy::new(DashMap::new);

pub fn get_or_insert_with(url: &str, build: impl FnOnce() -> GatewayClient) -> Arc<GatewayClient> {
    if let Some(existing) = CACHE.get(url) {
        return existing.clone();
    }
    CACHE
        .entry(url.to_string())
        .or_insert_with(|| Arc::new(build()))
        .clone()
}
