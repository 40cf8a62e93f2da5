use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use serde_json::Value;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::errors::ServiceError;
use crate::keys;

/// Filesystem-backed store of JSON documents under a single storage root.
///
/// Documents are keyed by sanitized client-supplied file names. Accesses to
/// the same key are serialized through a per-key mutex; lock entries are
/// evicted once the last holder releases them, so the table tracks in-flight
/// keys rather than every name ever seen. Rewrites go through a
/// temp-file-then-rename sequence so a failure mid-serialization never leaves
/// a half-written document behind.
#[derive(Clone)]
pub struct DocumentStore {
    root: PathBuf,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    /// Initialize the store at a root directory, creating it if missing.
    pub async fn new<P: Into<PathBuf>>(root: P) -> Result<Arc<Self>, ServiceError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| ServiceError::Io(e.to_string()))?;
        Ok(Arc::new(Self { root, locks: Arc::new(DashMap::new()) }))
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_default().clone()
    }

    /// Drop a lock handle and evict the table entry once nothing else holds
    /// it. Concurrent holders keep the strong count above one, so their entry
    /// survives until the last of them releases.
    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(key, |_, v| Arc::strong_count(v) == 1);
    }

    fn path_for(&self, name: &str) -> Result<(String, PathBuf), ServiceError> {
        let key = keys::sanitize(name)?;
        Ok((key.to_string(), self.root.join(key)))
    }

    /// Persist raw document bytes under a name, overwriting any existing file.
    pub async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ServiceError> {
        let (key, path) = self.path_for(name)?;
        let lock = self.lock_for(&key);
        let res = {
            let _guard = lock.lock().await;
            fs::write(&path, bytes)
                .await
                .map_err(|e| ServiceError::Io(e.to_string()))
        };
        self.release(&key, lock);
        res?;
        debug!(%key, len = bytes.len(), "document stored");
        Ok(())
    }

    /// Read the raw bytes of a stored document.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ServiceError> {
        let (key, path) = self.path_for(name)?;
        let lock = self.lock_for(&key);
        let res = {
            let _guard = lock.lock().await;
            match fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ServiceError::not_found(&key))
                }
                Err(e) => Err(ServiceError::Io(e.to_string())),
            }
        };
        self.release(&key, lock);
        res
    }

    /// Read-modify-write a stored document as JSON.
    ///
    /// The whole document is parsed and mutated in memory; only after the
    /// mutation succeeds is the result serialized (2-space indent) to a temp
    /// file next to the original and renamed over it.
    pub async fn update<F>(&self, name: &str, mutate: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut Value) -> Result<(), ServiceError>,
    {
        let (key, path) = self.path_for(name)?;
        let lock = self.lock_for(&key);
        let res = {
            let _guard = lock.lock().await;
            self.rewrite(&key, &path, mutate).await
        };
        self.release(&key, lock);
        res
    }

    async fn rewrite<F>(&self, key: &str, path: &Path, mutate: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut Value) -> Result<(), ServiceError>,
    {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::not_found(key));
            }
            Err(e) => return Err(ServiceError::Io(e.to_string())),
        };
        let mut doc: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Malformed(format!("{} is not valid JSON: {}", key, e)))?;

        mutate(&mut doc)?;

        let pretty =
            serde_json::to_vec_pretty(&doc).map_err(|e| ServiceError::Io(e.to_string()))?;
        let tmp = self
            .root
            .join(format!("{}.tmp-{}", key, uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, &pretty).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::Io(e.to_string()));
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::Io(e.to_string()));
        }
        debug!(%key, "document rewritten");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("document_store_{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_then_read_roundtrips() -> Result<(), anyhow::Error> {
        let root = temp_root();
        let store = DocumentStore::new(&root).await?;

        store.put("a.json", b"{\"x\":1}").await?;
        assert_eq!(store.read("a.json").await?, b"{\"x\":1}");

        // overwrite on collision
        store.put("a.json", b"{\"x\":2}").await?;
        assert_eq!(store.read("a.json").await?, b"{\"x\":2}");

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn read_missing_is_not_found() -> Result<(), anyhow::Error> {
        let store = DocumentStore::new(temp_root()).await?;
        match store.read("ghost.json").await {
            Err(ServiceError::NotFound(_)) => Ok(()),
            other => anyhow::bail!("expected NotFound, got {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn update_rewrites_pretty_and_creates_no_temp_leftovers() -> Result<(), anyhow::Error> {
        let root = temp_root();
        let store = DocumentStore::new(&root).await?;
        store.put("doc.json", br#"{"n":1,"keep":"me"}"#).await?;

        store
            .update("doc.json", |doc| {
                doc["n"] = json!(2);
                Ok(())
            })
            .await?;

        let bytes = store.read("doc.json").await?;
        let doc: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(doc["n"], 2);
        assert_eq!(doc["keep"], "me");
        // pretty output, not the original compact form
        assert!(String::from_utf8(bytes)?.contains('\n'));

        let mut entries = tokio::fs::read_dir(&root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["doc.json".to_string()]);

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_missing_is_not_found_and_creates_nothing() -> Result<(), anyhow::Error> {
        let root = temp_root();
        let store = DocumentStore::new(&root).await?;
        let res = store.update("ghost.json", |_| Ok(())).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));

        let mut entries = tokio::fs::read_dir(&root).await?;
        assert!(entries.next_entry().await?.is_none());

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_leaves_file_untouched_on_mutation_error() -> Result<(), anyhow::Error> {
        let root = temp_root();
        let store = DocumentStore::new(&root).await?;
        store.put("doc.json", br#"{"n":1}"#).await?;

        let res = store
            .update("doc.json", |_| {
                Err(ServiceError::Malformed("missing segment".into()))
            })
            .await;
        assert!(matches!(res, Err(ServiceError::Malformed(_))));
        assert_eq!(store.read("doc.json").await?, br#"{"n":1}"#);

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn lock_table_is_evicted_after_use() -> Result<(), anyhow::Error> {
        let root = temp_root();
        let store = DocumentStore::new(&root).await?;

        store.put("a.json", b"{\"n\":1}").await?;
        store.put("b.json", b"{\"n\":2}").await?;
        let _ = store.read("a.json").await?;
        store
            .update("a.json", |doc| {
                doc["n"] = json!(3);
                Ok(())
            })
            .await?;
        let _ = store.read("ghost.json").await;

        // every operation released its lock, so no entry lingers per name
        assert_eq!(store.locks.len(), 0);

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() -> Result<(), anyhow::Error> {
        let store = DocumentStore::new(temp_root()).await?;
        assert!(matches!(
            store.put("../evil.json", b"{}").await,
            Err(ServiceError::InvalidName(_))
        ));
        assert!(matches!(
            store.read("a/b.json").await,
            Err(ServiceError::InvalidName(_))
        ));
        Ok(())
    }
}
