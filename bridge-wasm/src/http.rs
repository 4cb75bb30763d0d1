//! WebAssembly implementation of the `HttpClient` bridge trait.
//!
//! Forwards requests to the global `fetch` (window or worker) and converts
//! the resulting `Response` back into an `HttpResponse`. Like `fetch`, any
//! HTTP status resolves successfully; only a rejected `fetch` or an elapsed
//! timeout is reported, as [`BridgeError::Network`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpRequest, HttpResponse},
};
use futures::{
    future::{select, Either},
    pin_mut, FutureExt,
};
use gloo_timers::future::TimeoutFuture;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, Response};

use crate::convert::{from_web_response, to_web_request};
use crate::error::{js_message, WasmError};
use crate::global::GlobalScope;

/// HTTP client backed by the global `fetch` of a window or worker.
pub struct WorkerHttpClient {
    scope: GlobalScope,
}

impl WorkerHttpClient {
    /// Create a client bound to the current global scope.
    pub fn new() -> BridgeResult<Self> {
        Ok(Self {
            scope: GlobalScope::current()?,
        })
    }

    /// Create a client bound to an explicit scope.
    pub fn with_scope(scope: GlobalScope) -> Self {
        Self { scope }
    }

    async fn fetch_with_timeout(
        &self,
        request: &Request,
        controller: Option<AbortController>,
        timeout: Option<Duration>,
    ) -> BridgeResult<Response> {
        let fetch = JsFuture::from(self.scope.fetch(request));

        let result = if let (Some(timeout), Some(controller)) = (timeout, controller) {
            let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
            let timeout_fut = TimeoutFuture::new(timeout_ms).map(|_| ());
            pin_mut!(timeout_fut);
            pin_mut!(fetch);

            match select(fetch, timeout_fut).await {
                Either::Left((response, _)) => response,
                Either::Right((_, pending_fetch)) => {
                    controller.abort();
                    let _ = pending_fetch.await;
                    return Err(BridgeError::Network(format!(
                        "request timed out after {} ms",
                        timeout.as_millis()
                    )));
                }
            }
        } else {
            fetch.await
        };

        let value = result.map_err(|err| WasmError::Fetch(js_message(&err)))?;
        value
            .dyn_into::<Response>()
            .map_err(|_| {
                WasmError::UnexpectedValue("fetch resolved to a non-Response".into()).into()
            })
    }
}

#[async_trait(?Send)]
impl HttpClient for WorkerHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let controller = match request.timeout {
            Some(_) => Some(
                AbortController::new()
                    .map_err(|err| WasmError::js("create abort controller", err))?,
            ),
            None => None,
        };

        let signal = controller.as_ref().map(|c| c.signal());
        let web_request = to_web_request(&request, signal.as_ref())?;
        let response = self
            .fetch_with_timeout(&web_request, controller, request.timeout)
            .await?;

        Ok(from_web_response(&response).await?)
    }
}
