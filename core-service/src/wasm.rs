//! Service worker entry point.
//!
//! The worker script only needs to load the wasm module and call
//! `startServiceWorker()`:
//!
//! ```js
//! importScripts("./cata_calc.js");
//! wasm_bindgen("./cata_calc_bg.wasm").then(() => wasm_bindgen.startServiceWorker());
//! ```
//!
//! Listeners are registered synchronously so the browser sees them during the
//! worker's first evaluation.

use bridge_wasm::convert::{from_web_request, to_web_response};
use bridge_wasm::error::js_message;
use core_offline::CacheConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::wasm::JsEventBus;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{ExtendableEvent, FetchEvent, ServiceWorkerGlobalScope};

use crate::{bootstrap_wasm, CoreService, DEFAULT_GENERATION, DEFAULT_MANIFEST};

fn to_js_error<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Register the `install`, `activate` and `fetch` listeners.
///
/// `generation` and `manifest` default to the deployed release. Manifest
/// entries resolve against the registration scope. The returned bus
/// publishes every lifecycle and fetch event.
#[wasm_bindgen(js_name = startServiceWorker)]
pub fn start_service_worker(
    generation: Option<String>,
    manifest: Option<Vec<String>>,
) -> Result<JsEventBus, JsValue> {
    if let Err(err) = init_logging(LoggingConfig::default()) {
        debug!(error = %err, "Logging already initialized");
    }

    let global: ServiceWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .map_err(|_| JsValue::from_str("startServiceWorker must run in a service worker"))?;

    let manifest = manifest.unwrap_or_else(|| {
        DEFAULT_MANIFEST
            .iter()
            .map(|entry| entry.to_string())
            .collect()
    });
    let config = CacheConfig::builder()
        .generation(generation.unwrap_or_else(|| DEFAULT_GENERATION.to_string()))
        .scope(global.registration().scope())
        .manifest(manifest)
        .build()
        .map_err(to_js_error)?;

    let service = bootstrap_wasm(config).map_err(to_js_error)?;
    register_install(&global, service.clone())?;
    register_activate(&global, service.clone())?;
    register_fetch(&global, service.clone())?;

    info!(
        generation = %service.config().generation,
        scope = %service.config().scope,
        "Service worker listeners registered"
    );
    Ok(JsEventBus::from_bus(service.event_bus().clone()))
}

fn register_install(global: &ServiceWorkerGlobalScope, service: CoreService) -> Result<(), JsValue> {
    let listener = Closure::<dyn FnMut(ExtendableEvent)>::new(move |event: ExtendableEvent| {
        let service = service.clone();
        // A rejected promise makes the browser discard this worker version.
        let promise = future_to_promise(async move {
            service
                .install()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(to_js_error)
        });
        if let Err(err) = event.wait_until(&promise) {
            warn!(error = %js_message(&err), "waitUntil rejected for install");
        }
    });

    global.add_event_listener_with_callback("install", listener.as_ref().unchecked_ref())?;
    listener.forget();
    Ok(())
}

fn register_activate(
    global: &ServiceWorkerGlobalScope,
    service: CoreService,
) -> Result<(), JsValue> {
    let listener = Closure::<dyn FnMut(ExtendableEvent)>::new(move |event: ExtendableEvent| {
        let service = service.clone();
        let promise = future_to_promise(async move {
            service
                .activate()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(to_js_error)
        });
        if let Err(err) = event.wait_until(&promise) {
            warn!(error = %js_message(&err), "waitUntil rejected for activate");
        }
    });

    global.add_event_listener_with_callback("activate", listener.as_ref().unchecked_ref())?;
    listener.forget();
    Ok(())
}

fn register_fetch(global: &ServiceWorkerGlobalScope, service: CoreService) -> Result<(), JsValue> {
    let listener = Closure::<dyn FnMut(FetchEvent)>::new(move |event: FetchEvent| {
        let web_request = event.request();
        // Anything else falls through to the browser's default handling.
        if web_request.method() != "GET" || !service.config().is_same_origin(&web_request.url()) {
            return;
        }

        let request = match from_web_request(&web_request) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Leaving unconvertible request to the browser");
                return;
            }
        };

        let service = service.clone();
        let promise = future_to_promise(async move {
            let reply = service.fetch(request).await.map_err(to_js_error)?;
            let response = to_web_response(&reply.response).map_err(to_js_error)?;
            Ok(response.into())
        });
        if let Err(err) = event.respond_with(&promise) {
            warn!(error = %js_message(&err), "respondWith rejected");
        }
    });

    global.add_event_listener_with_callback("fetch", listener.as_ref().unchecked_ref())?;
    listener.forget();
    Ok(())
}
