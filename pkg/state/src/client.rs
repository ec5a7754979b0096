use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use slatedb::Db;
use slatedb::object_store::ObjectStore;
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::memory::InMemory;
use slatedb::object_store::path::Path;
use std::sync::Arc;
use tracing::info;

/// Persistent state store backed by SlateDB.
///
/// Resources live as JSON documents under `/registry/<kind>/<namespace>/<id>`.
#[derive(Clone)]
pub struct StateStore {
    db: Db,
}

impl StateStore {
    /// Open (or create) a state store rooted at `path` on the local filesystem.
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        info!("Opening SlateDB state store at {}", path);

        // Ensure the data directory exists before opening the object store
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory {}: {}", path, e))?;

        let object_store = Arc::new(
            LocalFileSystem::new_with_prefix(path)
                .map_err(|e| anyhow::anyhow!("Failed to create local object store: {}", e))?,
        );
        Self::open(object_store).await
    }

    /// Open a store that lives entirely in memory. Used by tests.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::open(Arc::new(InMemory::new())).await
    }

    async fn open(object_store: Arc<dyn ObjectStore>) -> anyhow::Result<Self> {
        let db = Db::open(Path::from("/"), object_store)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open SlateDB: {}", e))?;
        Ok(Self { db })
    }

    /// Store a value under the given key.
    pub async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.db
            .put(key.as_bytes(), value)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("SlateDB put failed: {}", e))
    }

    /// Retrieve the value for a key, or `None` if it does not exist.
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self.db.get(key.as_bytes()).await {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("SlateDB get failed: {}", e)),
        }
    }

    /// Delete a key from the store.
    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.db
            .delete(key.as_bytes())
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("SlateDB delete failed: {}", e))
    }

    /// List all key-value pairs whose keys start with `prefix`.
    /// Returns them as `(key_string, raw_bytes)`.
    pub async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
        let mut results = Vec::new();
        let mut iter = self
            .db
            .scan_prefix(prefix.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB scan_prefix failed: {}", e))?;

        while let Some(kv) = iter
            .next()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB scan of {} failed: {}", prefix, e))?
        {
            let key = String::from_utf8_lossy(&kv.key).to_string();
            results.push((key, kv.value.to_vec()));
        }
        Ok(results)
    }

    /// Serialize `value` as JSON and store it under `key`.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let data = serde_json::to_vec(value)?;
        self.put(key, &data).await
    }

    /// Fetch and decode the JSON document at `key`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Decode every JSON document under `prefix`. Fails on the first entry
    /// that does not parse as `T`, so callers never act on a partial listing.
    pub async fn list_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> anyhow::Result<Vec<(String, T)>> {
        let entries = self.list_prefix(prefix).await?;
        let mut docs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let doc = serde_json::from_slice(&value)
                .with_context(|| format!("decoding {}", key))?;
            docs.push((key, doc));
        }
        Ok(docs)
    }

    /// Gracefully close the state store.
    pub async fn close(self) -> anyhow::Result<()> {
        info!("Closing SlateDB state store");
        self.db
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB close failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn json_documents_under_prefix() {
        let store = StateStore::in_memory().await.unwrap();
        store
            .put_json("/registry/docs/a", &Doc { name: "a".into(), count: 1 })
            .await
            .unwrap();
        store
            .put_json("/registry/docs/b", &Doc { name: "b".into(), count: 2 })
            .await
            .unwrap();
        store
            .put_json("/registry/other/c", &Doc { name: "c".into(), count: 3 })
            .await
            .unwrap();

        let docs: Vec<(String, Doc)> = store.list_json("/registry/docs/").await.unwrap();
        assert_eq!(docs.len(), 2);

        let b: Option<Doc> = store.get_json("/registry/docs/b").await.unwrap();
        assert_eq!(b.map(|d| d.count), Some(2));
    }

    #[tokio::test]
    async fn undecodable_entry_fails_the_listing() {
        let store = StateStore::in_memory().await.unwrap();
        store
            .put_json("/registry/docs/a", &Doc { name: "a".into(), count: 1 })
            .await
            .unwrap();
        store.put("/registry/docs/garbage", b"not json").await.unwrap();

        let err = store
            .list_json::<Doc>("/registry/docs/")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/registry/docs/garbage"));
        assert_eq!(store.list_prefix("/registry/docs/").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = StateStore::in_memory().await.unwrap();
        store.put("/registry/docs/a", b"{}").await.unwrap();
        store.delete("/registry/docs/a").await.unwrap();
        assert!(store.get("/registry/docs/a").await.unwrap().is_none());
    }
}
