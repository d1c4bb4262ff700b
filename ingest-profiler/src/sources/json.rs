//! JSON profiling.
//!
//! Fields come from the root object, or from the first element of a root
//! array when that element is an object. Every other element is ignored for
//! schema purposes, and the profile always reports a single row.

use serde_json::Value;
use tracing::{debug, instrument};

use super::{normalize_field_names, FormatParser};
use crate::analyzers::inference::TypeInferenceEngine;
use crate::core::{DataField, DataFormat, DataProfile, FieldType};
use crate::error::{ProfilerError, Result};

/// Fixed quality score reported for JSON input.
pub const JSON_QUALITY_SCORE: f64 = 0.9;

const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for JsonParser {
    fn format(&self) -> DataFormat {
        DataFormat::Json
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn parse(&self, bytes: &[u8]) -> Result<DataProfile> {
        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| ProfilerError::parse(DataFormat::Json, e.to_string()))?;

        let fields = match &root {
            Value::Object(map) => fields_from_object(map),
            Value::Array(items) => match items.first() {
                Some(Value::Object(map)) => fields_from_object(map),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let sample_data = match &root {
            Value::Array(items) => {
                Value::Array(items.iter().take(SAMPLE_ROWS).cloned().collect()).to_string()
            }
            other => other.to_string(),
        };

        debug!(columns = fields.len(), "Profiled JSON input");

        Ok(DataProfile {
            data_type: DataFormat::Json,
            total_rows: 1,
            sampled_rows: 1,
            fields,
            sample_data,
            data_quality_score: JSON_QUALITY_SCORE,
            file_size: bytes.len() as u64,
            encoding: DataProfile::ENCODING.to_string(),
            delimiter: None,
            has_headers: false,
        })
    }
}

fn fields_from_object(map: &serde_json::Map<String, Value>) -> Vec<DataField> {
    normalize_field_names(map.keys().map(String::as_str))
        .into_iter()
        .zip(map.values())
        .map(|(name, value)| {
            let field_type = TypeInferenceEngine::infer_json_value(value);
            let mut field = DataField::new(name, field_type)
                .with_null_count(u64::from(value.is_null()));

            match value {
                Value::Null => {}
                Value::String(s) => field = field.with_sample_value(s.clone()),
                other => field = field.with_sample_value(other.to_string()),
            }

            if field_type == FieldType::Numeric {
                let n = value.as_f64();
                field = field.with_bounds(n, n);
            }
            field
        })
        .collect()
}
