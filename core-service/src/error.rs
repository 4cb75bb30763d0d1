use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Offline cache error: {0}")]
    Offline(#[from] core_offline::OfflineError),
}

impl CoreError {
    /// The request failed for lack of network and nothing was cached for it.
    pub fn is_network(&self) -> bool {
        matches!(self, CoreError::Offline(err) if err.is_network())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
