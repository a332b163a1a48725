//! HTTP implementations of the reconciliation collaborators.
//!
//! [`PlatformClient`] speaks the target platform's wire-encoded RPC API and
//! implements `TargetClient`; [`CatalogClient`] reads declared apps from the
//! catalog REST API and implements `SourceClient`.

mod catalog;
mod client;
mod error;

#[cfg(test)]
mod test_server;

pub use catalog::CatalogClient;
pub use client::PlatformClient;
pub use error::{PlatformError, Result};

const DEFAULT_PLATFORM_API_URL: &str = "https://api.adplatform.example.com";
const DEFAULT_CATALOG_API_URL: &str = "https://catalog.adsync.example.com";

fn env_url(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Target platform API base URL, from `ADSYNC_PLATFORM_URL` when set.
pub fn platform_base_url() -> String {
    env_url("ADSYNC_PLATFORM_URL", DEFAULT_PLATFORM_API_URL)
}

/// Catalog API base URL, from `ADSYNC_CATALOG_URL` when set.
pub fn catalog_base_url() -> String {
    env_url("ADSYNC_CATALOG_URL", DEFAULT_CATALOG_API_URL)
}
