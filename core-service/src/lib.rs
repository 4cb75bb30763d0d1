//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (cache storage,
//! HTTP, worker activation) into the offline cache controller. Desktop hosts
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`), whereas WebAssembly builds enable the `wasm` feature,
//! rely on the adapters from `bridge-wasm` and register the service worker
//! listeners through `wasm::start_service_worker`.

pub mod deployment;
pub mod error;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

pub use deployment::{default_cache_config, DEFAULT_GENERATION, DEFAULT_MANIFEST};
pub use error::{CoreError, Result};

pub use core_offline::{
    ActivationReport, CacheConfig, FetchResponse, InstallReport, ResponseSource,
};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};

use std::sync::Arc;

use bridge_traits::{
    cache::CacheStorage, http::HttpClient, lifecycle::ActivationControl, HttpRequest,
};
use core_offline::OfflineCacheController;
use core_runtime::config::CoreConfig;
use tracing::{info, warn};

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
use bridge_wasm::{build_wasm_bridges, WasmBridgeSet};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub cache_storage: Arc<dyn CacheStorage>,
    pub http_client: Arc<dyn HttpClient>,
    pub activation_control: Arc<dyn ActivationControl>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        cache_storage: Arc<dyn CacheStorage>,
        http_client: Arc<dyn HttpClient>,
        activation_control: Arc<dyn ActivationControl>,
    ) -> Self {
        Self {
            cache_storage,
            http_client,
            activation_control,
        }
    }
}

impl From<&CoreConfig> for CoreDependencies {
    fn from(config: &CoreConfig) -> Self {
        Self {
            cache_storage: Arc::clone(&config.cache_storage),
            http_client: Arc::clone(&config.http_client),
            activation_control: Arc::clone(&config.activation_control),
        }
    }
}

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
impl From<WasmBridgeSet> for CoreDependencies {
    fn from(set: WasmBridgeSet) -> Self {
        Self {
            cache_storage: set.cache_storage,
            http_client: set.http_client,
            activation_control: set.activation_control,
        }
    }
}

/// Primary façade exposed to host applications.
///
/// Clones share the controller, the bridges and the event bus.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    controller: Arc<OfflineCacheController>,
    event_bus: EventBus,
}

impl CoreService {
    /// Create a new service from the provided dependencies.
    pub fn new(deps: CoreDependencies, cache_config: CacheConfig) -> Result<Self> {
        Self::assemble(deps, cache_config, EventBus::default())
    }

    /// Create a service from a validated runtime configuration.
    pub fn from_config(core_config: &CoreConfig, cache_config: CacheConfig) -> Result<Self> {
        core_config.validate()?;
        Self::assemble(
            CoreDependencies::from(core_config),
            cache_config,
            EventBus::new(core_config.event_buffer_size),
        )
    }

    fn assemble(
        deps: CoreDependencies,
        cache_config: CacheConfig,
        event_bus: EventBus,
    ) -> Result<Self> {
        let controller = OfflineCacheController::new(
            cache_config,
            Arc::clone(&deps.cache_storage),
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.activation_control),
        )?
        .with_event_bus(event_bus.clone());

        Ok(Self {
            deps: Arc::new(deps),
            controller: Arc::new(controller),
            event_bus,
        })
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn config(&self) -> &CacheConfig {
        self.controller.config()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to install, activation and fetch events.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Run the install step: precache every manifest asset.
    pub async fn install(&self) -> Result<InstallReport> {
        Ok(self.controller.on_install().await?)
    }

    /// Run the activate step: drop stale generations and claim clients.
    pub async fn activate(&self) -> Result<ActivationReport> {
        Ok(self.controller.on_activate().await?)
    }

    /// Install, then activate only if the install succeeded.
    ///
    /// This is the whole lifecycle for hosts without a separate activation
    /// signal. A failed install leaves every existing generation in place.
    pub async fn install_and_activate(&self) -> Result<(InstallReport, ActivationReport)> {
        let installed = match self.controller.on_install().await {
            Ok(report) => report,
            Err(err) => {
                warn!(
                    generation = %self.controller.generation(),
                    error = %err,
                    "Install failed, keeping previous generation"
                );
                return Err(err.into());
            }
        };
        let activated = self.controller.on_activate().await?;
        info!(
            generation = %installed.generation,
            assets = installed.assets_cached,
            deleted = activated.deleted.len(),
            "Generation is live"
        );
        Ok((installed, activated))
    }

    /// Answer a request network-first with cache fallback.
    pub async fn fetch(&self, request: HttpRequest) -> Result<FetchResponse> {
        Ok(self.controller.on_fetch(request).await?)
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("controller", &self.controller)
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Caches persist below `cache_dir` when given and live in memory otherwise.
///
/// ```no_run
/// # fn example() -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, default_cache_config};
///
/// let config = default_cache_config("https://calc.example/")?;
/// let core = bootstrap_desktop(config, Some("/var/cache/calc".into()))?;
/// # Ok(())
/// # }
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub fn bootstrap_desktop(
    cache_config: CacheConfig,
    cache_dir: Option<std::path::PathBuf>,
) -> Result<CoreService> {
    let mut builder = CoreConfig::builder();
    if let Some(dir) = cache_dir {
        builder = builder.cache_dir(dir);
    }
    let core_config = builder.build()?;
    CoreService::from_config(&core_config, cache_config)
}

/// Convenience bootstrapper for the service worker global scope.
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub fn bootstrap_wasm(cache_config: CacheConfig) -> Result<CoreService> {
    let bridges =
        build_wasm_bridges().map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    CoreService::new(CoreDependencies::from(bridges), cache_config)
}
