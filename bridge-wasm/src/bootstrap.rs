//! Convenience helpers for wiring all wasm bridge implementations together.
//!
//! Host shells can use [`build_wasm_bridges`] to construct the cache storage,
//! HTTP client and activation control for the running global scope in one
//! call. The result mirrors the role that the `bridge-desktop` crate plays
//! for native targets.

use std::sync::Arc;

use bridge_traits::{
    cache::CacheStorage, error::Result as BridgeResult, http::HttpClient,
    lifecycle::ActivationControl,
};

use crate::{
    cache_storage::WebCacheStorage, clients::ServiceWorkerActivation, global::GlobalScope,
    http::WorkerHttpClient,
};

/// Fully constructed wasm bridge objects ready for injection into the core.
pub struct WasmBridgeSet {
    /// The global `caches` object.
    pub cache_storage: Arc<dyn CacheStorage>,
    /// HTTP client powered by the global `fetch`.
    pub http_client: Arc<dyn HttpClient>,
    /// `skipWaiting` / `clients.claim` of the service worker.
    pub activation_control: Arc<dyn ActivationControl>,
}

/// Build every bridge for the current service worker.
///
/// # Errors
///
/// Returns [`bridge_traits::BridgeError::NotAvailable`] when not running in a
/// service worker or when the Cache API is missing (for example on an
/// insecure origin).
pub fn build_wasm_bridges() -> BridgeResult<WasmBridgeSet> {
    let scope = GlobalScope::current()?;
    let activation = ServiceWorkerActivation::new()?;
    let storage = WebCacheStorage::with_scope(&scope)?;

    Ok(WasmBridgeSet {
        cache_storage: Arc::new(storage),
        http_client: Arc::new(WorkerHttpClient::with_scope(scope)),
        activation_control: Arc::new(activation),
    })
}
