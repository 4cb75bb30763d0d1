//! Service worker activation hooks.

use async_trait::async_trait;
use bridge_traits::{error::Result as BridgeResult, lifecycle::ActivationControl};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::ServiceWorkerGlobalScope;

use crate::error::WasmError;

/// `skipWaiting()` and `clients.claim()` of the running service worker.
#[derive(Clone)]
pub struct ServiceWorkerActivation {
    scope: ServiceWorkerGlobalScope,
}

impl ServiceWorkerActivation {
    /// Bind to the current global scope, which must be a service worker.
    pub fn new() -> BridgeResult<Self> {
        let scope = js_sys::global()
            .dyn_into::<ServiceWorkerGlobalScope>()
            .map_err(|_| WasmError::Unavailable("not running in a service worker".to_string()))?;
        Ok(Self { scope })
    }

    /// Wrap an explicit service worker scope.
    pub fn with_scope(scope: ServiceWorkerGlobalScope) -> Self {
        Self { scope }
    }
}

#[async_trait(?Send)]
impl ActivationControl for ServiceWorkerActivation {
    async fn skip_waiting(&self) -> BridgeResult<()> {
        let promise = self
            .scope
            .skip_waiting()
            .map_err(|err| WasmError::js("skipWaiting", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| WasmError::js("skipWaiting", err))?;
        Ok(())
    }

    async fn claim_clients(&self) -> BridgeResult<()> {
        JsFuture::from(self.scope.clients().claim())
            .await
            .map_err(|err| WasmError::js("clients.claim", err))?;
        Ok(())
    }
}
