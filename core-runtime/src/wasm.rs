//! WASM bindings for core-runtime
//!
//! Exposes logging setup and the cache event bus to JavaScript so a page or
//! worker script can observe install, activation and offline-fallback events.

use crate::events::{EventBus, Receiver, CoreEvent};
use crate::logging::{init_logging, LoggingConfig};
use bridge_traits::log::LogLevel;
use wasm_bindgen::prelude::*;

fn to_js_error<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// JavaScript-accessible logging configuration
#[wasm_bindgen]
#[derive(Clone, Default)]
pub struct JsLoggingConfig {
    inner: LoggingConfig,
}

#[wasm_bindgen]
impl JsLoggingConfig {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set minimum log level (0 = Trace, 1 = Debug, 2 = Info, 3 = Warn, 4 = Error)
    #[wasm_bindgen(js_name = setLevel)]
    pub fn set_level(&mut self, level: u8) {
        self.inner.level = match level {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Info,
        };
    }

    #[wasm_bindgen(js_name = setRedactPii)]
    pub fn set_redact_pii(&mut self, redact: bool) {
        self.inner.redact_pii = redact;
    }
}

/// Install the browser console subscriber.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging_js(config: JsLoggingConfig) -> Result<(), JsValue> {
    init_logging(config.inner).map_err(to_js_error)
}

/// Event bus handle shared with JavaScript.
#[wasm_bindgen]
#[derive(Clone)]
pub struct JsEventBus {
    inner: EventBus,
}

impl JsEventBus {
    pub fn from_bus(inner: EventBus) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &EventBus {
        &self.inner
    }
}

#[wasm_bindgen]
impl JsEventBus {
    #[wasm_bindgen(constructor)]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: EventBus::new(capacity),
        }
    }

    /// Publish an event given as JSON (`{"type": "...", "payload": {...}}`).
    pub fn emit(&self, event_json: &str) -> Result<usize, JsValue> {
        let event: CoreEvent = serde_json::from_str(event_json).map_err(to_js_error)?;
        self.inner.emit(event).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = subscriberCount)]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    pub fn subscribe(&self) -> JsEventReceiver {
        JsEventReceiver {
            receiver: self.inner.subscribe(),
        }
    }
}

/// Polling receiver; events are returned as JSON strings.
#[wasm_bindgen]
pub struct JsEventReceiver {
    receiver: Receiver<CoreEvent>,
}

#[wasm_bindgen]
impl JsEventReceiver {
    /// Next pending event, or `undefined` when none is queued.
    ///
    /// Events missed because the receiver lagged are skipped.
    #[wasm_bindgen(js_name = tryRecv)]
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return serde_json::to_string(&event).ok(),
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
