//! Outputs of the recommendation engine: storage decision, table schema and DDL metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DataFormat, FieldType};

/// Target storage systems a profile can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageSystem {
    PostgreSQL,
    ClickHouse,
    #[serde(rename = "HDFS")]
    Hdfs,
}

impl StorageSystem {
    /// All systems in canonical display order.
    pub const ALL: [StorageSystem; 3] = [Self::PostgreSQL, Self::ClickHouse, Self::Hdfs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::ClickHouse => "ClickHouse",
            Self::Hdfs => "HDFS",
        }
    }
}

impl fmt::Display for StorageSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explanation attached to a storage decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageReasoning {
    pub file_type: DataFormat,
    pub data_volume: u64,
    pub quality_score: f64,
    pub rationale: String,
}

/// Suitability of one storage system for the profiled data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageOption {
    pub suitable: bool,
    pub reasons: Vec<String>,
}

/// Per-system options, always populated for all three systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageOptions {
    pub postgresql: StorageOption,
    pub clickhouse: StorageOption,
    pub hdfs: StorageOption,
}

impl StorageOptions {
    pub fn get(&self, system: StorageSystem) -> &StorageOption {
        match system {
            StorageSystem::PostgreSQL => &self.postgresql,
            StorageSystem::ClickHouse => &self.clickhouse,
            StorageSystem::Hdfs => &self.hdfs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecommendation {
    pub primary_storage: StorageSystem,
    pub secondary_storage: Vec<StorageSystem>,
    pub reasoning: StorageReasoning,
    pub storage_options: StorageOptions,
}

/// One column of the derived target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableField {
    pub name: String,
    /// SQL type in PostgreSQL spelling, e.g. `DECIMAL(10,2)`.
    #[serde(rename = "type")]
    pub sql_type: String,
    pub nullable: bool,
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIndex {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(rename = "type")]
    pub index_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: String,
    #[serde(rename = "type")]
    pub constraint_type: String,
    pub expression: String,
}

/// Derived DDL target for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub fields: Vec<TableField>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<TableIndex>,
    pub constraints: Vec<TableConstraint>,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&TableField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of indexed fields in column order.
    pub fn indexed_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.indexed)
            .map(|f| f.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresTarget {
    pub table_name: String,
    pub schema: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickHouseTarget {
    pub table_name: String,
    pub engine: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdfsTarget {
    pub location: String,
    pub file_format: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlTargets {
    pub postgresql: PostgresTarget,
    pub clickhouse: ClickHouseTarget,
    pub hdfs: HdfsTarget,
}

/// Computed summary of the data handed to the DDL generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCharacteristics {
    /// Whole megabytes, `file_size / 1024 / 1024`.
    pub estimated_size_mb: u64,
    pub row_count: u64,
    pub column_count: usize,
    pub data_types: Vec<FieldType>,
}

impl DataCharacteristics {
    /// Display form, e.g. `~12MB`.
    pub fn estimated_size(&self) -> String {
        format!("~{}MB", self.estimated_size_mb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlMetadata {
    pub ddl_generation: DdlTargets,
    pub data_characteristics: DataCharacteristics,
}

/// Everything the recommendation engine derives from a single profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendations: Vec<String>,
    pub storage: StorageRecommendation,
    pub schema: TableSchema,
    pub ddl_metadata: DdlMetadata,
}
