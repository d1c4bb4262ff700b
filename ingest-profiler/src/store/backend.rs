//! `object_store`-backed storage: a local directory tree or S3/MinIO.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::ObjectStorage;
use crate::error::{ProfilerError, Result};
#[cfg(feature = "s3")]
use crate::security::SecureString;

/// Connection settings for an S3-compatible endpoint.
#[cfg(feature = "s3")]
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: Option<SecureString>,
    pub secret_key: Option<SecureString>,
    /// Needed for plain-HTTP MinIO deployments.
    pub allow_http: bool,
}

#[derive(Debug, Clone)]
enum Location {
    /// One sub-directory per bucket under `root`.
    Local { root: PathBuf },
    #[cfg(feature = "s3")]
    S3(S3Settings),
}

/// [`ObjectStorage`] on top of the `object_store` crate.
///
/// With a local root, each bucket maps to a directory that is created on the
/// first `put`. S3 buckets are never created: `object_store` has no bucket
/// management API, so the bucket must already exist.
pub struct ObjectStoreBackend {
    location: Location,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreBackend {
    /// Uses `root` as the parent directory of all buckets.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Local { root: root.into() },
            stores: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(feature = "s3")]
    pub fn s3(settings: S3Settings) -> Self {
        Self {
            location: Location::S3(settings),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves the store for `bucket`. Returns `None` when a local bucket
    /// directory does not exist and `create` is false.
    async fn store_for(&self, bucket: &str, create: bool) -> Result<Option<Arc<dyn ObjectStore>>> {
        if let Some(store) = self.stores.read().await.get(bucket) {
            return Ok(Some(Arc::clone(store)));
        }

        let store: Arc<dyn ObjectStore> = match &self.location {
            Location::Local { root } => {
                validate_bucket(bucket)?;
                let dir = root.join(bucket);
                if !tokio::fs::try_exists(&dir).await? {
                    if !create {
                        return Ok(None);
                    }
                    debug!(bucket, dir = %dir.display(), "Creating bucket directory");
                    tokio::fs::create_dir_all(&dir).await?;
                }
                let fs = LocalFileSystem::new_with_prefix(&dir)
                    .map_err(|e| ProfilerError::object_store("open", e.to_string()))?;
                Arc::new(fs)
            }
            #[cfg(feature = "s3")]
            Location::S3(settings) => {
                let mut builder = object_store::aws::AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_region(&settings.region)
                    .with_allow_http(settings.allow_http);
                if let Some(endpoint) = &settings.endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Some(key) = &settings.access_key {
                    builder = builder.with_access_key_id(key.expose());
                }
                if let Some(secret) = &settings.secret_key {
                    builder = builder.with_secret_access_key(secret.expose());
                }
                let s3 = builder
                    .build()
                    .map_err(|e| ProfilerError::object_store("open", e.to_string()))?;
                Arc::new(s3)
            }
        };

        self.stores
            .write()
            .await
            .insert(bucket.to_string(), Arc::clone(&store));
        Ok(Some(store))
    }

    fn supports_attributes(&self) -> bool {
        !matches!(self.location, Location::Local { .. })
    }
}

fn validate_bucket(bucket: &str) -> Result<()> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && bucket != "."
        && bucket != "..";
    if valid {
        Ok(())
    } else {
        Err(ProfilerError::Security(format!(
            "invalid bucket name '{bucket}'"
        )))
    }
}

fn object_path(key: &str) -> Result<ObjectPath> {
    ObjectPath::parse(key).map_err(|e| ProfilerError::object_store("path", e.to_string()))
}

fn map_error(operation: &str, bucket: &str, key: &str, err: object_store::Error) -> ProfilerError {
    match err {
        object_store::Error::NotFound { .. } => {
            ProfilerError::not_found("object", format!("{bucket}/{key}"))
        }
        other => ProfilerError::object_store(operation, other.to_string()),
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreBackend {
    #[instrument(skip(self, bytes), fields(size = bytes.len(), storage = "object_store"))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let store = self
            .store_for(bucket, true)
            .await?
            .ok_or_else(|| ProfilerError::object_store("put", format!("bucket '{bucket}' unavailable")))?;
        let path = object_path(key)?;

        let mut options = PutOptions::default();
        if self.supports_attributes() {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            options.attributes = attributes;
        }

        store
            .put_opts(&path, PutPayload::from(bytes), options)
            .await
            .map_err(|e| map_error("put", bucket, key, e))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let Some(store) = self.store_for(bucket, false).await? else {
            return Err(ProfilerError::not_found("object", format!("{bucket}/{key}")));
        };
        let path = object_path(key)?;
        let result = store
            .get(&path)
            .await
            .map_err(|e| map_error("get", bucket, key, e))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| map_error("get", bucket, key, e))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let Some(store) = self.store_for(bucket, false).await? else {
            return Ok(());
        };
        let path = object_path(key)?;
        match store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_error("delete", bucket, key, e)),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let Some(store) = self.store_for(bucket, false).await? else {
            return Ok(Vec::new());
        };
        // object_store prefixes match whole segments; callers pass raw string prefixes
        let metas: Vec<_> = store
            .list(None)
            .try_collect()
            .await
            .map_err(|e| map_error("list", bucket, prefix, e))?;
        let mut keys: Vec<String> = metas
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let Some(store) = self.store_for(bucket, false).await? else {
            return Ok(false);
        };
        let path = object_path(key)?;
        match store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(map_error("exists", bucket, key, e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        match self.location {
            Location::Local { .. } => "local",
            #[cfg(feature = "s3")]
            Location::S3(_) => "s3",
        }
    }
}
