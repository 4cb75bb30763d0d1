//! # Core Configuration Module
//!
//! Provides host bridge configuration for the offline cache core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding every bridge the cache controller talks to. It enforces
//! fail-fast validation so a host learns about a missing capability at startup
//! rather than on the first install event.
//!
//! ## Required Dependencies
//!
//! - `CacheStorage` - Named request/response caches
//! - `HttpClient` - The network side of network-first fetching
//! - `ActivationControl` - `skipWaiting` / `clients.claim` hooks
//!
//! When the `desktop-shims` feature is enabled, `bridge-desktop` adapters are
//! injected for every bridge that was not provided: `FsCacheStorage` when a
//! cache directory is configured (otherwise `MemoryCacheStorage`),
//! `ReqwestHttpClient` and `HeadlessActivationControl`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .cache_storage(Arc::new(MyCacheStorage))
//!     .http_client(Arc::new(MyHttpClient))
//!     .activation_control(Arc::new(MyActivationControl))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! Missing bridges are reported as [`Error::CapabilityMissing`] with a message
//! naming the adapter each platform is expected to inject.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{ActivationControl, CacheStorage, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for the event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Host bridges and runtime settings for the offline cache core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Named request/response caches
    pub cache_storage: Arc<dyn CacheStorage>,

    /// Network access used for installs and network-first fetches
    pub http_client: Arc<dyn HttpClient>,

    /// Worker activation hooks
    pub activation_control: Arc<dyn ActivationControl>,

    /// Directory backing the default desktop cache storage, if any
    pub cache_dir: Option<PathBuf>,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cache_storage", &"CacheStorage { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("activation_control", &"ActivationControl { ... }")
            .field("cache_dir", &self.cache_dir)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if let Some(dir) = &self.cache_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("Cache directory cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn cache_storage_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "CacheStorage".to_string(),
        message: "CacheStorage implementation is required to hold cache generations. \
                 Desktop: enable the 'desktop-shims' feature to use MemoryCacheStorage or FsCacheStorage. \
                 Web: inject bridge_wasm::WebCacheStorage."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for network-first fetching. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Web: inject bridge_wasm::WorkerHttpClient."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn activation_control_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ActivationControl".to_string(),
        message: "ActivationControl implementation is required for skipWaiting/clients.claim. \
                 Desktop: enable the 'desktop-shims' feature to use HeadlessActivationControl. \
                 Web: inject bridge_wasm::ServiceWorkerActivation."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_cache_storage(cache_dir: Option<&PathBuf>) -> Result<Arc<dyn CacheStorage>> {
    use bridge_desktop::{FsCacheStorage, MemoryCacheStorage};

    let storage: Arc<dyn CacheStorage> = match cache_dir {
        Some(dir) => Arc::new(FsCacheStorage::new(dir.clone())),
        None => Arc::new(MemoryCacheStorage::new()),
    };
    Ok(storage)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_cache_storage(_cache_dir: Option<&PathBuf>) -> Result<Arc<dyn CacheStorage>> {
    Err(cache_storage_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::try_new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_activation_control() -> Result<Arc<dyn ActivationControl>> {
    use bridge_desktop::HeadlessActivationControl;

    Ok(Arc::new(HeadlessActivationControl::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_activation_control() -> Result<Arc<dyn ActivationControl>> {
    Err(activation_control_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    cache_storage: Option<Arc<dyn CacheStorage>>,
    http_client: Option<Arc<dyn HttpClient>>,
    activation_control: Option<Arc<dyn ActivationControl>>,
    cache_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the cache storage bridge.
    pub fn cache_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache_storage = Some(storage);
        self
    }

    /// Sets the HTTP client bridge.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the activation control bridge.
    pub fn activation_control(mut self, control: Arc<dyn ActivationControl>) -> Self {
        self.activation_control = Some(control);
        self
    }

    /// Sets the directory used by the default desktop cache storage.
    ///
    /// Ignored when a cache storage bridge is injected explicitly.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the event bus capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the [`CoreConfig`], filling missing bridges with platform defaults
    /// when available.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a bridge is absent and no default exists
    /// - [`Error::Config`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let cache_storage = match self.cache_storage {
            Some(storage) => storage,
            None => provide_default_cache_storage(self.cache_dir.as_ref())?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let activation_control = match self.activation_control {
            Some(control) => control,
            None => provide_default_activation_control()?,
        };

        let config = CoreConfig {
            cache_storage,
            http_client,
            activation_control,
            cache_dir: self.cache_dir,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::cache::Cache;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};

    struct NullCacheStorage;

    #[async_trait]
    impl CacheStorage for NullCacheStorage {
        async fn open(&self, _name: &str) -> BridgeResult<Arc<dyn Cache>> {
            Err(bridge_traits::BridgeError::NotAvailable("cache".to_string()))
        }

        async fn has(&self, _name: &str) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _name: &str) -> BridgeResult<bool> {
            Ok(false)
        }
    }

    struct OfflineHttpClient;

    #[async_trait]
    impl HttpClient for OfflineHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::Network(request.url))
        }
    }

    struct NoopActivation;

    #[async_trait]
    impl ActivationControl for NoopActivation {
        async fn skip_waiting(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn claim_clients(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn full_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .cache_storage(Arc::new(NullCacheStorage))
            .http_client(Arc::new(OfflineHttpClient))
            .activation_control(Arc::new(NoopActivation))
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = full_builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_builder_custom_event_buffer() {
        let config = full_builder().event_buffer_size(8).build().unwrap();
        assert_eq!(config.event_buffer_size, 8);
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = full_builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_huge_event_buffer() {
        let result = full_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_cache_dir() {
        let result = full_builder().cache_dir("").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = full_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("CacheStorage { ... }"));
        assert!(rendered.contains("event_buffer_size"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_cache_storage() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(OfflineHttpClient))
            .activation_control(Arc::new(NoopActivation))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "CacheStorage");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client() {
        let result = CoreConfig::builder()
            .cache_storage(Arc::new(NullCacheStorage))
            .activation_control(Arc::new(NoopActivation))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HttpClient"
        ));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_activation_control() {
        let result = CoreConfig::builder()
            .cache_storage(Arc::new(NullCacheStorage))
            .http_client(Arc::new(OfflineHttpClient))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "ActivationControl"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder().build().unwrap();
        assert!(config.cache_dir.is_none());
    }
}
