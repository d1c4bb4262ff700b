//! Structural profile of one ingested file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProfilerError;

/// Source format of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
    Xml,
}

impl DataFormat {
    /// Detects the format from a filename extension, case-insensitively.
    ///
    /// Returns `None` for anything other than `.csv`, `.json` or `.xml`;
    /// callers decide on a fallback.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }

    /// Lower-case tag used in serialized profiles and DAG parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }

    /// MIME type recorded when the raw upload is mirrored to the object store.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            other => Err(ProfilerError::UnsupportedFormat {
                filename: other.to_string(),
            }),
        }
    }
}

/// Inferred semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Numeric,
    String,
    Timestamp,
    Boolean,
    Null,
    Object,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Timestamp => "timestamp",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column or attribute of a profiled dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub nullable: bool,
    pub null_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DataField {
    /// Creates a non-nullable field with no observed statistics.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            null_count: 0,
            sample_value: None,
            min_value: None,
            max_value: None,
            description: None,
        }
    }

    /// Records the number of empty cells; the field becomes nullable when any were seen.
    pub fn with_null_count(mut self, null_count: u64) -> Self {
        self.null_count = null_count;
        self.nullable = null_count > 0;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_sample_value(mut self, sample: impl Into<String>) -> Self {
        self.sample_value = Some(sample.into());
        self
    }

    /// Sets numeric bounds. Ignored unless the field is numeric.
    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if self.field_type == FieldType::Numeric {
            self.min_value = min;
            self.max_value = max;
        }
        self
    }
}

/// Structural and quality summary of one ingested file.
///
/// Created once per upload by a format parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    pub data_type: DataFormat,
    pub total_rows: u64,
    pub sampled_rows: u64,
    pub fields: Vec<DataField>,
    pub sample_data: String,
    pub data_quality_score: f64,
    pub file_size: u64,
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    pub has_headers: bool,
}

impl DataProfile {
    /// Encoding reported by every parser.
    pub const ENCODING: &'static str = "UTF-8";

    /// Returns the field names in source order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Looks up a field by exact name.
    pub fn field(&self, name: &str) -> Option<&DataField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if any field has the given type.
    pub fn has_field_type(&self, field_type: FieldType) -> bool {
        self.fields.iter().any(|f| f.field_type == field_type)
    }

    /// Distinct field types in order of first appearance.
    pub fn distinct_field_types(&self) -> Vec<FieldType> {
        let mut seen = Vec::new();
        for field in &self.fields {
            if !seen.contains(&field.field_type) {
                seen.push(field.field_type);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection_from_extension() {
        assert_eq!(DataFormat::from_filename("sales.csv"), Some(DataFormat::Csv));
        assert_eq!(DataFormat::from_filename("dump.JSON"), Some(DataFormat::Json));
        assert_eq!(
            DataFormat::from_filename("archive.2024.xml"),
            Some(DataFormat::Xml)
        );
        assert_eq!(DataFormat::from_filename("notes.txt"), None);
        assert_eq!(DataFormat::from_filename("README"), None);
    }

    #[test]
    fn test_field_serializes_type_key() {
        let field = DataField::new("age", FieldType::Numeric).with_bounds(Some(25.0), Some(30.0));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "numeric");
        assert_eq!(json["min_value"], 25.0);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_bounds_ignored_for_non_numeric() {
        let field = DataField::new("name", FieldType::String).with_bounds(Some(1.0), Some(2.0));
        assert_eq!(field.min_value, None);
        assert_eq!(field.max_value, None);
    }

    #[test]
    fn test_null_count_sets_nullable() {
        assert!(DataField::new("a", FieldType::String).with_null_count(2).nullable);
        assert!(!DataField::new("a", FieldType::String).with_null_count(0).nullable);
    }

    #[test]
    fn test_distinct_field_types_keep_first_seen_order() {
        let profile = DataProfile {
            data_type: DataFormat::Csv,
            total_rows: 0,
            sampled_rows: 0,
            fields: vec![
                DataField::new("a", FieldType::String),
                DataField::new("b", FieldType::Numeric),
                DataField::new("c", FieldType::String),
            ],
            sample_data: String::new(),
            data_quality_score: 0.0,
            file_size: 0,
            encoding: DataProfile::ENCODING.to_string(),
            delimiter: None,
            has_headers: true,
        };
        assert_eq!(
            profile.distinct_field_types(),
            vec![FieldType::String, FieldType::Numeric]
        );
        assert_eq!(profile.field_names(), vec!["a", "b", "c"]);
    }
}
