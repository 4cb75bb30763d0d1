//! The deployed application shell.

use core_offline::CacheConfig;

use crate::Result;

/// Cache generation of the current release. Bump it to roll out new assets.
pub const DEFAULT_GENERATION: &str = "cata_calc_1";

/// Assets precached on install, relative to the worker scope.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./cata_calc.js",
    "./cata_calc_bg.wasm",
];

/// Cache configuration for the deployed release served under `scope`.
pub fn default_cache_config(scope: &str) -> Result<CacheConfig> {
    Ok(CacheConfig::builder()
        .generation(DEFAULT_GENERATION)
        .scope(scope)
        .manifest(DEFAULT_MANIFEST.iter().copied())
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_resolves_against_scope() {
        let config = default_cache_config("https://calc.example/app/").unwrap();

        assert_eq!(config.generation.as_str(), "cata_calc_1");
        let urls: Vec<&str> = config.manifest.urls().iter().map(|u| u.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://calc.example/app/",
                "https://calc.example/app/index.html",
                "https://calc.example/app/cata_calc.js",
                "https://calc.example/app/cata_calc_bg.wasm",
            ]
        );
    }

    #[test]
    fn test_default_config_rejects_non_http_scope() {
        assert!(default_cache_config("file:///srv/app/").is_err());
    }
}
