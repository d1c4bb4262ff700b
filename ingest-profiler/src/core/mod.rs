//! Core data model shared by parsers, the recommendation engine and the orchestrator.

pub mod analysis;
pub mod profile;
pub mod recommendation;

pub use analysis::{AnalysisResult, AnalysisStatus, DdlSource, FileRecord, FileStatus};
pub use profile::{DataField, DataFormat, DataProfile, FieldType};
pub use recommendation::{
    ClickHouseTarget, DataCharacteristics, DdlMetadata, DdlTargets, HdfsTarget, PostgresTarget,
    Recommendation, StorageOption, StorageOptions, StorageReasoning, StorageRecommendation,
    StorageSystem, TableConstraint, TableField, TableIndex, TableSchema,
};
