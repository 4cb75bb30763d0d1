use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("Manifest asset {url} is unreachable: {reason}")]
    AssetUnreachable { url: String, reason: String },

    #[error("Manifest asset {url} was rejected with HTTP status {status}")]
    AssetRejected { url: String, status: u16 },

    #[error("Cache storage error: {0}")]
    CacheStorage(#[source] BridgeError),

    /// The network failed and no cached response could stand in for it.
    #[error("Network request failed: {0}")]
    Network(#[source] BridgeError),
}

impl OfflineError {
    /// Whether the error leaves the request without any response.
    pub fn is_network(&self) -> bool {
        matches!(self, OfflineError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, OfflineError>;
