//! # Offline Asset Cache Controller
//!
//! Owns one cache generation and mediates every fetch through a
//! network-first, cache-fallback policy.
//!
//! ## Lifecycle
//!
//! 1. **Install** ([`OfflineCacheController::on_install`]): fetch every manifest
//!    asset and store them in the current generation, all or nothing. On
//!    success ask the host to activate immediately.
//! 2. **Activate** ([`OfflineCacheController::on_activate`]): delete every
//!    other generation, then claim open clients.
//! 3. **Fetch** ([`OfflineCacheController::on_fetch`]): try the network; copy
//!    any response into the cache; on network failure serve the cached entry.
//!
//! The host runs install to completion before activate. Fetches may overlap
//! each other and the lifecycle handlers freely.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_offline::{CacheConfig, OfflineCacheController};
//!
//! let controller = OfflineCacheController::new(config, storage, http, activation)?;
//! controller.on_install().await?;
//! controller.on_activate().await?;
//!
//! let reply = controller.on_fetch(HttpRequest::get("https://app.example/")).await?;
//! if reply.is_from_cache() {
//!     show_offline_banner();
//! }
//! ```

use std::sync::Arc;

use bridge_traits::{
    cache::{cache_key, is_cacheable, Cache},
    ActivationControl, BridgeError, CacheStorage, HttpClient, HttpRequest, HttpResponse,
};
use core_runtime::events::{ActivationEvent, CoreEvent, EventBus, FetchEvent, InstallEvent};
use core_runtime::logging::redact_query;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::CacheConfig,
    error::{OfflineError, Result},
    report::{ActivationReport, FetchResponse, InstallReport, StaleDeletionFailure},
};

/// Network-first offline cache for a single generation.
pub struct OfflineCacheController {
    config: CacheConfig,
    storage: Arc<dyn CacheStorage>,
    http_client: Arc<dyn HttpClient>,
    activation: Arc<dyn ActivationControl>,
    event_bus: Option<EventBus>,
}

impl OfflineCacheController {
    /// Create a controller for `config.generation`.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn new(
        config: CacheConfig,
        storage: Arc<dyn CacheStorage>,
        http_client: Arc<dyn HttpClient>,
        activation: Arc<dyn ActivationControl>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            storage,
            http_client,
            activation,
            event_bus: None,
        })
    }

    /// Publish lifecycle events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Name of the current generation.
    pub fn generation(&self) -> &str {
        self.config.generation.as_str()
    }

    /// Populate the current generation with every manifest asset.
    ///
    /// # Errors
    ///
    /// - [`OfflineError::AssetUnreachable`] if an asset produced no response
    /// - [`OfflineError::AssetRejected`] if an asset answered with a non-2xx status
    /// - [`OfflineError::CacheStorage`] if the generation could not be written
    ///
    /// On error nothing is stored and the host must not activate this
    /// generation. A generation created by the failed attempt is removed.
    #[instrument(skip(self), fields(generation = %self.config.generation))]
    pub async fn on_install(&self) -> Result<InstallReport> {
        let generation = self.generation().to_string();
        let asset_count = self.config.manifest.len();

        info!(asset_count, "Installing cache generation");
        self.emit(CoreEvent::Install(InstallEvent::Started {
            generation: generation.clone(),
            asset_count,
        }));

        let existed = self
            .storage
            .has(&generation)
            .await
            .map_err(OfflineError::CacheStorage)?;

        if let Err(err) = self.populate(&generation).await {
            warn!(error = %err, "Cache install failed");
            if !existed {
                self.discard_generation(&generation).await;
            }
            self.emit(CoreEvent::Install(InstallEvent::Failed {
                generation,
                message: err.to_string(),
            }));
            return Err(err);
        }

        if let Err(err) = self.activation.skip_waiting().await {
            warn!(error = %err, "skip_waiting was refused; activation waits for older instances");
        }

        info!(assets_cached = asset_count, "Cache install completed");
        self.emit(CoreEvent::Install(InstallEvent::Completed {
            generation: generation.clone(),
            assets_cached: asset_count,
        }));

        Ok(InstallReport {
            generation,
            assets_cached: asset_count,
        })
    }

    async fn populate(&self, generation: &str) -> Result<()> {
        let cache = self
            .storage
            .open(generation)
            .await
            .map_err(OfflineError::CacheStorage)?;

        let entries = self.fetch_manifest().await?;
        cache
            .put_all(entries)
            .await
            .map_err(OfflineError::CacheStorage)
    }

    /// Fetch every manifest asset concurrently.
    ///
    /// The first failing asset in manifest order decides the error.
    async fn fetch_manifest(&self) -> Result<Vec<(HttpRequest, HttpResponse)>> {
        let outcomes = join_all(self.config.manifest.requests().into_iter().map(
            |request| async move {
                let outcome = self.http_client.execute(request.clone()).await;
                (request, outcome)
            },
        ))
        .await;

        let mut entries = Vec::with_capacity(outcomes.len());
        for (request, outcome) in outcomes {
            match outcome {
                Ok(response) if response.is_success() => {
                    debug!(url = %request.url, status = response.status, "Fetched manifest asset");
                    entries.push((request, response));
                }
                Ok(response) => {
                    return Err(OfflineError::AssetRejected {
                        url: request.url,
                        status: response.status,
                    });
                }
                Err(err) => {
                    return Err(OfflineError::AssetUnreachable {
                        url: request.url,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(entries)
    }

    async fn discard_generation(&self, generation: &str) {
        match self.storage.delete(generation).await {
            Ok(_) => debug!("Removed partially installed generation"),
            Err(err) => warn!(error = %err, "Failed to remove partially installed generation"),
        }
    }

    /// Delete every stale generation, then claim open clients.
    ///
    /// Deletions run concurrently and independently; individual failures are
    /// reported in [`ActivationReport::failed`] and never abort the others or
    /// the claim.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::CacheStorage`] only if the generations could
    /// not be enumerated.
    #[instrument(skip(self), fields(generation = %self.config.generation))]
    pub async fn on_activate(&self) -> Result<ActivationReport> {
        let current = self.generation().to_string();
        let stale: Vec<String> = self
            .storage
            .keys()
            .await
            .map_err(OfflineError::CacheStorage)?
            .into_iter()
            .filter(|name| *name != current)
            .collect();

        let outcomes = join_all(stale.into_iter().map(|name| async move {
            info!(stale_generation = %name, "Deleting old cache");
            let outcome = self.storage.delete(&name).await;
            (name, outcome)
        }))
        .await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(existed) => {
                    if !existed {
                        debug!(stale_generation = %name, "Stale generation was already gone");
                    }
                    self.emit(CoreEvent::Activation(
                        ActivationEvent::StaleGenerationDeleted {
                            generation: name.clone(),
                        },
                    ));
                    deleted.push(name);
                }
                Err(err) => {
                    warn!(stale_generation = %name, error = %err, "Failed to delete old cache");
                    self.emit(CoreEvent::Activation(
                        ActivationEvent::StaleGenerationDeleteFailed {
                            generation: name.clone(),
                            message: err.to_string(),
                        },
                    ));
                    failed.push(StaleDeletionFailure {
                        generation: name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let clients_claimed = match self.activation.claim_clients().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Failed to claim open clients");
                false
            }
        };

        info!(
            deleted = deleted.len(),
            failed = failed.len(),
            clients_claimed,
            "Cache activation completed"
        );
        self.emit(CoreEvent::Activation(ActivationEvent::Completed {
            generation: current.clone(),
            deleted: deleted.len(),
            failed: failed.len(),
            clients_claimed,
        }));

        Ok(ActivationReport {
            generation: current,
            deleted,
            failed,
            clients_claimed,
        })
    }

    /// Answer a request network-first.
    ///
    /// Any HTTP response counts as a network success and is copied into the
    /// current generation before being returned. When the network fails the
    /// cached entry for the request is returned instead. Non-`GET` requests
    /// go to the network only.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::Network`] with the original failure when the
    /// network failed and nothing usable was cached.
    #[instrument(
        skip(self, request),
        fields(method = %request.method, url = %redact_query(&request.url))
    )]
    pub async fn on_fetch(&self, request: HttpRequest) -> Result<FetchResponse> {
        if !is_cacheable(&request) {
            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(OfflineError::Network)?;
            return Ok(FetchResponse::from_network(response));
        }

        match self.http_client.execute(request.clone()).await {
            Ok(response) => {
                debug!(status = response.status, "Served from network");
                self.store_copy(&request, &response).await;
                self.emit(CoreEvent::Fetch(FetchEvent::ServedFromNetwork {
                    url: cache_key(&request),
                    status: response.status,
                }));
                Ok(FetchResponse::from_network(response))
            }
            Err(network_err) => self.fall_back_to_cache(&request, network_err).await,
        }
    }

    async fn store_copy(&self, request: &HttpRequest, response: &HttpResponse) {
        let outcome = match self.storage.open(self.generation()).await {
            Ok(cache) => cache.put(request, response.clone()).await,
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            warn!(error = %err, "Failed to update cache entry");
            self.emit(CoreEvent::Fetch(FetchEvent::CacheWriteFailed {
                url: cache_key(request),
                message: err.to_string(),
            }));
        }
    }

    async fn fall_back_to_cache(
        &self,
        request: &HttpRequest,
        network_err: BridgeError,
    ) -> Result<FetchResponse> {
        debug!(error = %network_err, "Network failed, checking cache");

        match self.lookup(request).await {
            Ok(Some(response)) => {
                info!(status = response.status, "Served from cache");
                self.emit(CoreEvent::Fetch(FetchEvent::ServedFromCache {
                    url: cache_key(request),
                    status: response.status,
                }));
                Ok(FetchResponse::from_cache(response))
            }
            Ok(None) => {
                debug!("No cached response");
                self.emit(CoreEvent::Fetch(FetchEvent::Failed {
                    url: cache_key(request),
                    message: network_err.to_string(),
                }));
                Err(OfflineError::Network(network_err))
            }
            Err(lookup_err) => {
                warn!(error = %lookup_err, "Cache lookup failed");
                self.emit(CoreEvent::Fetch(FetchEvent::Failed {
                    url: cache_key(request),
                    message: network_err.to_string(),
                }));
                Err(OfflineError::Network(network_err))
            }
        }
    }

    /// Look up a request in the current generation without creating it.
    async fn lookup(
        &self,
        request: &HttpRequest,
    ) -> bridge_traits::error::Result<Option<HttpResponse>> {
        if !self.storage.has(self.generation()).await? {
            return Ok(None);
        }
        let cache: Arc<dyn Cache> = self.storage.open(self.generation()).await?;
        cache.match_request(request).await
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event).ok();
        }
    }
}

impl std::fmt::Debug for OfflineCacheController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCacheController")
            .field("generation", &self.config.generation)
            .field("scope", &self.config.scope.as_str())
            .field("assets", &self.config.manifest.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    mock! {
        Activation {}

        #[async_trait]
        impl ActivationControl for Activation {
            async fn skip_waiting(&self) -> BridgeResult<()>;
            async fn claim_clients(&self) -> BridgeResult<()>;
        }
    }

    mock! {
        Storage {}

        #[async_trait]
        impl CacheStorage for Storage {
            async fn open(&self, name: &str) -> BridgeResult<Arc<dyn Cache>>;
            async fn has(&self, name: &str) -> BridgeResult<bool>;
            async fn keys(&self) -> BridgeResult<Vec<String>>;
            async fn delete(&self, name: &str) -> BridgeResult<bool>;
        }
    }

    mock! {
        Entries {}

        #[async_trait]
        impl Cache for Entries {
            async fn put_all(&self, entries: Vec<(HttpRequest, HttpResponse)>) -> BridgeResult<()>;
            async fn match_request(&self, request: &HttpRequest) -> BridgeResult<Option<HttpResponse>>;
            async fn put(&self, request: &HttpRequest, response: HttpResponse) -> BridgeResult<()>;
            async fn delete(&self, request: &HttpRequest) -> BridgeResult<bool>;
            async fn keys(&self) -> BridgeResult<Vec<String>>;
        }
    }

    fn config(manifest: &[&str]) -> CacheConfig {
        CacheConfig::builder()
            .generation("app-v2")
            .scope("https://app.example/")
            .manifest(manifest.iter().copied())
            .build()
            .unwrap()
    }

    fn controller(
        manifest: &[&str],
        storage: MockStorage,
        http: MockHttp,
        activation: MockActivation,
    ) -> OfflineCacheController {
        OfflineCacheController::new(
            config(manifest),
            Arc::new(storage),
            Arc::new(http),
            Arc::new(activation),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_install_rejected_asset_skips_skip_waiting_and_discards_new_generation() {
        let mut storage = MockStorage::new();
        storage
            .expect_has()
            .withf(|name| name == "app-v2")
            .times(1)
            .returning(|_| Ok(false));
        storage.expect_open().times(1).returning(|_| {
            let mut cache = MockEntries::new();
            cache.expect_put_all().never();
            Ok(Arc::new(cache) as Arc<dyn Cache>)
        });
        storage
            .expect_delete()
            .withf(|name| name == "app-v2")
            .times(1)
            .returning(|_| Ok(true));

        let mut http = MockHttp::new();
        http.expect_execute().times(2).returning(|request| {
            if request.url.ends_with("missing.js") {
                Ok(HttpResponse::new(404, "not found"))
            } else {
                Ok(HttpResponse::new(200, "ok"))
            }
        });

        let mut activation = MockActivation::new();
        activation.expect_skip_waiting().never();

        let controller = controller(&["./", "./missing.js"], storage, http, activation);
        let err = controller.on_install().await.unwrap_err();

        assert!(matches!(
            err,
            OfflineError::AssetRejected { status: 404, ref url } if url == "https://app.example/missing.js"
        ));
    }

    #[tokio::test]
    async fn test_install_failure_keeps_preexisting_generation() {
        let mut storage = MockStorage::new();
        storage.expect_has().returning(|_| Ok(true));
        storage
            .expect_open()
            .returning(|_| Ok(Arc::new(MockEntries::new()) as Arc<dyn Cache>));
        storage.expect_delete().never();

        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::Network("offline".to_string())));

        let mut activation = MockActivation::new();
        activation.expect_skip_waiting().never();

        let controller = controller(&["./"], storage, http, activation);
        let err = controller.on_install().await.unwrap_err();
        assert!(matches!(err, OfflineError::AssetUnreachable { .. }));
    }

    #[tokio::test]
    async fn test_install_tolerates_refused_skip_waiting() {
        let mut storage = MockStorage::new();
        storage.expect_has().returning(|_| Ok(false));
        storage.expect_open().times(1).returning(|_| {
            let mut cache = MockEntries::new();
            cache
                .expect_put_all()
                .withf(|entries| entries.len() == 1)
                .times(1)
                .returning(|_| Ok(()));
            Ok(Arc::new(cache) as Arc<dyn Cache>)
        });

        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "<html>")));

        let mut activation = MockActivation::new();
        activation
            .expect_skip_waiting()
            .times(1)
            .returning(|| Err(BridgeError::NotAvailable("skipWaiting".to_string())));

        let controller = controller(&["./index.html"], storage, http, activation);
        let report = controller.on_install().await.unwrap();
        assert_eq!(report.assets_cached, 1);
        assert_eq!(report.generation, "app-v2");
    }

    #[tokio::test]
    async fn test_activate_continues_past_failed_deletion() {
        let mut storage = MockStorage::new();
        storage.expect_keys().returning(|| {
            Ok(vec![
                "app-v0".to_string(),
                "app-v1".to_string(),
                "app-v2".to_string(),
            ])
        });
        storage
            .expect_delete()
            .withf(|name| name == "app-v0")
            .times(1)
            .returning(|_| Err(BridgeError::CacheStorage("locked".to_string())));
        storage
            .expect_delete()
            .withf(|name| name == "app-v1")
            .times(1)
            .returning(|_| Ok(true));

        let mut activation = MockActivation::new();
        activation.expect_claim_clients().times(1).returning(|| Ok(()));

        let controller = controller(&[], storage, MockHttp::new(), activation);
        let report = controller.on_activate().await.unwrap();

        assert_eq!(report.deleted, vec!["app-v1".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].generation, "app-v0");
        assert!(report.clients_claimed);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_activate_records_failed_claim() {
        let mut storage = MockStorage::new();
        storage.expect_keys().returning(|| Ok(vec!["app-v2".to_string()]));
        storage.expect_delete().never();

        let mut activation = MockActivation::new();
        activation
            .expect_claim_clients()
            .times(1)
            .returning(|| Err(BridgeError::OperationFailed("claim".to_string())));

        let controller = controller(&[], storage, MockHttp::new(), activation);
        let report = controller.on_activate().await.unwrap();

        assert!(report.deleted.is_empty());
        assert!(!report.clients_claimed);
    }

    #[tokio::test]
    async fn test_activate_fails_when_generations_cannot_be_listed() {
        let mut storage = MockStorage::new();
        storage
            .expect_keys()
            .returning(|| Err(BridgeError::CacheStorage("unavailable".to_string())));

        let mut activation = MockActivation::new();
        activation.expect_claim_clients().never();

        let controller = controller(&[], storage, MockHttp::new(), activation);
        assert!(matches!(
            controller.on_activate().await,
            Err(OfflineError::CacheStorage(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_returns_network_response_when_cache_write_fails() {
        let mut storage = MockStorage::new();
        storage.expect_open().times(1).returning(|_| {
            let mut cache = MockEntries::new();
            cache
                .expect_put()
                .times(1)
                .returning(|_, _| Err(BridgeError::CacheStorage("quota exceeded".to_string())));
            Ok(Arc::new(cache) as Arc<dyn Cache>)
        });

        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, "fresh")));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let controller =
            controller(&[], storage, http, MockActivation::new()).with_event_bus(bus);

        let reply = controller
            .on_fetch(HttpRequest::get("https://app.example/data.json"))
            .await
            .unwrap();

        assert_eq!(reply.response.body.as_ref(), b"fresh");
        assert!(!reply.is_from_cache());
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Fetch(FetchEvent::CacheWriteFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_lookup_error_surfaces_network_failure() {
        let mut storage = MockStorage::new();
        storage
            .expect_has()
            .returning(|_| Err(BridgeError::CacheStorage("corrupt".to_string())));

        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::Network("dns".to_string())));

        let controller = controller(&[], storage, http, MockActivation::new());
        let err = controller
            .on_fetch(HttpRequest::get("https://app.example/"))
            .await
            .unwrap_err();

        assert!(matches!(err, OfflineError::Network(BridgeError::Network(ref m)) if m == "dns"));
    }

    #[tokio::test]
    async fn test_fetch_non_get_never_touches_storage() {
        let mut storage = MockStorage::new();
        storage.expect_open().never();
        storage.expect_has().never();

        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Network("offline".to_string())));

        let controller = controller(&[], storage, http, MockActivation::new());
        let request = HttpRequest::new(bridge_traits::HttpMethod::Post, "https://app.example/api");

        assert!(controller.on_fetch(request).await.unwrap_err().is_network());
    }
}
