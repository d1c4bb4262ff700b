//! In-memory object storage for testing and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use super::ObjectStorage;
use crate::error::{ProfilerError, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

type Buckets = HashMap<String, BTreeMap<String, StoredObject>>;

/// Keeps every bucket in a shared map. Clones share the same contents.
#[derive(Clone, Default)]
pub struct InMemoryObjectStorage {
    buckets: Arc<RwLock<Buckets>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bucket_exists(&self, bucket: &str) -> bool {
        self.buckets.read().await.contains_key(bucket)
    }

    /// Content type recorded at `put` time.
    pub async fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.content_type.clone())
    }

    /// Number of objects across all buckets.
    pub async fn len(&self) -> usize {
        self.buckets.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    #[instrument(skip(self, bytes), fields(size = bytes.len(), storage = "in_memory"))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| ProfilerError::not_found("object", format!("{bucket}/{key}")))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        if let Some(objects) = self.buckets.write().await.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
