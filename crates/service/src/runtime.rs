//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

/// Ensure the storage root directory exists before serving requests.
pub async fn ensure_env(storage_root: &str) -> anyhow::Result<()> {
    common::env::ensure_storage_root(storage_root).await
}
