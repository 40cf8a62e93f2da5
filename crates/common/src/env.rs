//! Environment/runtime helpers
//!
//! Sanity checks to ensure the storage root exists at startup.

use tracing::info;

/// Ensure the storage root directory exists, creating it if absent.
pub async fn ensure_storage_root(storage_root: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(storage_root).await.is_err() {
        info!(%storage_root, "storage root not found; creating");
    }
    tokio::fs::create_dir_all(storage_root)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {storage_root}: {e}"))?;
    Ok(())
}
