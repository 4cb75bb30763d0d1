use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The request never produced an HTTP response (offline, DNS, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache storage error: {0}")]
    CacheStorage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error represents a transport-level network failure.
    pub fn is_network(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
