//! Errors raised while assembling the cache runtime.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected `CoreConfig` values (event buffer size, cache directory) or
    /// a logging setup that could not be installed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No cache storage, HTTP client or activation control bridge was
    /// provided and the platform has no default for it.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A default bridge failed to start, e.g. the desktop HTTP client.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_names_the_bridge() {
        let err = Error::CapabilityMissing {
            capability: "CacheStorage".to_string(),
            message: "no cache storage bridge was provided".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Capability missing: CacheStorage - no cache storage bridge was provided"
        );
    }
}
