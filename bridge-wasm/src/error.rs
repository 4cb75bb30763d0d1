//! Error types for WebAssembly bridge implementations

use bridge_traits::error::BridgeError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors raised while talking to browser APIs
#[derive(Error, Debug)]
pub enum WasmError {
    /// A browser API rejected or threw
    #[error("JavaScript error during {context}: {message}")]
    JavaScript {
        /// Operation that failed
        context: String,
        /// Message extracted from the thrown value
        message: String,
    },

    /// `fetch` rejected without producing a response
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The running global scope lacks a required API
    #[error("Browser API unavailable: {0}")]
    Unavailable(String),

    /// A value did not have the expected JavaScript type
    #[error("Unexpected JavaScript value: {0}")]
    UnexpectedValue(String),
}

impl WasmError {
    /// Wrap a thrown JavaScript value with the operation it came from.
    pub fn js(context: &str, value: JsValue) -> Self {
        WasmError::JavaScript {
            context: context.to_string(),
            message: js_message(&value),
        }
    }
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::Fetch(message) => BridgeError::Network(message),
            WasmError::Unavailable(message) => BridgeError::NotAvailable(message),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

/// Best-effort human readable message for a thrown JavaScript value.
pub fn js_message(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        message
    } else if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        error.message().into()
    } else {
        format!("{:?}", value)
    }
}
