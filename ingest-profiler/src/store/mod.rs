//! Object store capability used to mirror raw uploads.
//!
//! The orchestrator only depends on the [`ObjectStorage`] trait. Two adapters
//! ship with the crate:
//!
//! - [`InMemoryObjectStorage`] for tests and single-process use
//! - [`ObjectStoreBackend`] (feature `cloud-storage`) backed by the
//!   `object_store` crate, for a local directory or S3/MinIO (feature `s3`)

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;

#[cfg(feature = "cloud-storage")]
mod backend;
mod memory;

#[cfg(feature = "cloud-storage")]
pub use backend::ObjectStoreBackend;
#[cfg(feature = "s3")]
pub use backend::S3Settings;
pub use memory::InMemoryObjectStorage;

/// Content type used when the format is unknown.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Blob storage keyed by `(bucket, key)`.
///
/// Implementations create a missing bucket on the first `put` where the
/// backend allows it. Deleting a missing key is not an error.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<()>;

    /// Fetches an object. Missing objects yield [`ProfilerError::NotFound`](crate::error::ProfilerError::NotFound).
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Lists keys under `prefix`, sorted.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;
}

/// Builds the object key for an uploaded file:
/// `users/{user_id}/files/{unix_ts}_{stem}{ext}`.
///
/// The stem is reduced to ASCII alphanumerics, `-` and `_` so the key is safe
/// on every backend.
///
/// # Examples
///
/// ```rust
/// use ingest_profiler::store::object_key;
///
/// let key = object_key("user_1", "my report (final).csv");
/// assert!(key.starts_with("users/user_1/files/"));
/// assert!(key.ends_with("_my_report__final_.csv"));
/// ```
pub fn object_key(user_id: &str, file_name: &str) -> String {
    object_key_at(user_id, file_name, Utc::now().timestamp())
}

pub(crate) fn object_key_at(user_id: &str, file_name: &str, unix_ts: i64) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "upload".to_string() } else { stem };
    format!("users/{user_id}/files/{unix_ts}_{stem}{ext}")
}
