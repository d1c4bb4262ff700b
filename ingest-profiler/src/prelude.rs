//! Prelude for commonly used types and traits in ingest-profiler.

pub use crate::config::PipelineConfig;
pub use crate::core::{AnalysisResult, AnalysisStatus, DataFormat, DataProfile, FieldType, StorageSystem};
pub use crate::error::{ErrorContext, ProfilerError, Result};
pub use crate::formatters::{HumanFormatter, JsonFormatter, MarkdownFormatter, ReportConfig, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::pipeline::{AnalysisQueue, AnalysisRequest, AnalysisRunner};
pub use crate::sources::FormatParser;
