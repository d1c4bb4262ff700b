//! Target table schema and DDL metadata derived from a profile.

use crate::core::{
    ClickHouseTarget, DataCharacteristics, DataProfile, DdlMetadata, DdlTargets, FieldType,
    HdfsTarget, PostgresTarget, TableConstraint, TableField, TableIndex, TableSchema,
};

/// Default name of the derived table.
pub const DEFAULT_TABLE_NAME: &str = "analyzed_data";

/// Lower-case substrings that mark a field as worth indexing.
const INDEX_HINTS: [&str; 5] = ["id", "created", "updated", "timestamp", "date"];

/// Maps an inferred field type to its PostgreSQL column type.
pub fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Numeric => "DECIMAL(10,2)",
        FieldType::String => "VARCHAR(255)",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Null | FieldType::Object => "TEXT",
    }
}

pub fn is_index_candidate(name: &str) -> bool {
    let lower = name.to_lowercase();
    INDEX_HINTS.iter().any(|hint| lower.contains(hint))
}

#[derive(Debug, Clone)]
pub struct SchemaDeriver {
    table_name: String,
}

impl Default for SchemaDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_NAME)
    }
}

impl SchemaDeriver {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// One table field per profile field, in the same order.
    pub fn derive(&self, profile: &DataProfile) -> TableSchema {
        let fields: Vec<TableField> = profile
            .fields
            .iter()
            .map(|f| TableField {
                name: f.name.clone(),
                sql_type: sql_type(f.field_type).to_string(),
                nullable: f.nullable,
                indexed: is_index_candidate(&f.name),
                description: f.description.clone(),
            })
            .collect();

        let indexes = fields
            .iter()
            .filter(|f| f.indexed)
            .map(|f| TableIndex {
                name: format!("idx_{}", f.name),
                fields: vec![f.name.clone()],
                index_type: "btree".to_string(),
            })
            .collect();

        let constraints = if fields.is_empty() {
            Vec::new()
        } else {
            vec![TableConstraint {
                name: "chk_data_quality".to_string(),
                constraint_type: "CHECK".to_string(),
                expression: "data_quality_score > 0".to_string(),
            }]
        };

        TableSchema {
            table_name: self.table_name.clone(),
            fields,
            primary_key: vec!["id".to_string()],
            indexes,
            constraints,
        }
    }

    /// Static per-target descriptions plus computed data characteristics.
    pub fn ddl_metadata(&self, profile: &DataProfile) -> DdlMetadata {
        let features =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };

        DdlMetadata {
            ddl_generation: DdlTargets {
                postgresql: PostgresTarget {
                    table_name: self.table_name.clone(),
                    schema: "public".to_string(),
                    features: features(&[
                        "JSONB metadata columns",
                        "Date-based partitioning",
                        "Indexes for analytical queries",
                    ]),
                },
                clickhouse: ClickHouseTarget {
                    table_name: self.table_name.clone(),
                    engine: "MergeTree".to_string(),
                    features: features(&["Columnar storage", "Compression", "Partitioning"]),
                },
                hdfs: HdfsTarget {
                    location: format!("/data/{}", self.table_name),
                    file_format: "Parquet".to_string(),
                    features: features(&["Distributed storage", "Replication", "Schema-on-read"]),
                },
            },
            data_characteristics: DataCharacteristics {
                estimated_size_mb: profile.file_size / 1024 / 1024,
                row_count: profile.total_rows,
                column_count: profile.fields.len(),
                data_types: profile.distinct_field_types(),
            },
        }
    }
}
