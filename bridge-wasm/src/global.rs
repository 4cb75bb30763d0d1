//! Access to the running global scope.
//!
//! The bridges work both in a page (`Window`) and in a worker
//! (`WorkerGlobalScope`, which includes service workers).

use js_sys::Promise;
use wasm_bindgen::JsCast;
use web_sys::{CacheStorage, Request, Window, WorkerGlobalScope};

use crate::error::{WasmError, WasmResult};

/// The global object the bridges run in.
#[derive(Clone)]
pub enum GlobalScope {
    /// A document context
    Window(Window),
    /// A dedicated, shared or service worker
    Worker(WorkerGlobalScope),
}

impl GlobalScope {
    /// Detect the current global scope.
    pub fn current() -> WasmResult<Self> {
        let global = js_sys::global();
        if let Some(window) = global.dyn_ref::<Window>() {
            return Ok(GlobalScope::Window(window.clone()));
        }
        if let Some(worker) = global.dyn_ref::<WorkerGlobalScope>() {
            return Ok(GlobalScope::Worker(worker.clone()));
        }
        Err(WasmError::Unavailable(
            "global scope is neither a window nor a worker".to_string(),
        ))
    }

    /// Start a `fetch` for `request`.
    pub fn fetch(&self, request: &Request) -> Promise {
        match self {
            GlobalScope::Window(window) => window.fetch_with_request(request),
            GlobalScope::Worker(worker) => worker.fetch_with_request(request),
        }
    }

    /// The `caches` object of this scope.
    pub fn caches(&self) -> WasmResult<CacheStorage> {
        let caches = match self {
            GlobalScope::Window(window) => window.caches(),
            GlobalScope::Worker(worker) => worker.caches(),
        };
        caches.map_err(|err| WasmError::js("caches", err))
    }
}
