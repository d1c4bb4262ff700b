//! Analysis orchestration.
//!
//! [`AnalysisRunner`] drives one upload through the pipeline:
//!
//! 1. read the raw bytes (fatal on I/O error)
//! 2. mirror them to the object store (best effort)
//! 3. detect the format (fatal if unsupported)
//! 4. parse into a [`DataProfile`](crate::core::DataProfile) (fatal on parse error)
//! 5. derive recommendations, storage, schema and DDL metadata
//! 6. enrich with LLM analysis and DDL (best effort, deterministic DDL fallback)
//! 7. optionally trigger the downstream workflow (best effort)
//!
//! [`AnalysisQueue`] runs the same pipeline on a background worker and
//! exposes submit-then-poll semantics.

use std::path::{Path, PathBuf};

use crate::core::DataFormat;

mod runner;
mod worker;

pub use runner::AnalysisRunner;
pub use worker::{AnalysisHandle, AnalysisQueue, WorkerStats};

/// Where the uploaded bytes come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Bytes already in memory (e.g. a multipart upload).
    Bytes(Vec<u8>),
    /// A file on the local filesystem, read with `tokio::fs`.
    Path(PathBuf),
}

/// One file to analyse.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub user_id: String,
    pub file_name: String,
    pub source: UploadSource,
    /// Used when the file name has no recognised extension.
    pub declared_format: Option<DataFormat>,
}

impl AnalysisRequest {
    pub fn from_bytes(
        user_id: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            file_name: file_name.into(),
            source: UploadSource::Bytes(bytes.into()),
            declared_format: None,
        }
    }

    /// The file name is taken from the last path component.
    pub fn from_path(user_id: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            user_id: user_id.into(),
            file_name,
            source: UploadSource::Path(path.to_path_buf()),
            declared_format: None,
        }
    }

    pub fn with_declared_format(mut self, format: DataFormat) -> Self {
        self.declared_format = Some(format);
        self
    }
}
