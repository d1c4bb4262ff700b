//! Semicolon-delimited CSV profiling.

use ::csv::{ReaderBuilder, StringRecord};
use tracing::{debug, instrument};

use super::{normalize_field_names, FormatParser};
use crate::analyzers::inference::{TypeInferenceEngine, DEFAULT_SAMPLE_SIZE};
use crate::analyzers::quality::QualityScorer;
use crate::core::{DataField, DataFormat, DataProfile, FieldType};
use crate::error::{ProfilerError, Result};

/// Default field delimiter.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Parses CSV bytes into a [`DataProfile`].
///
/// The first record is always the header. Every record must have the same
/// number of fields as the header.
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    inference: TypeInferenceEngine,
    inference_rows: usize,
    sample_rows: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            inference: TypeInferenceEngine::new(),
            inference_rows: DEFAULT_SAMPLE_SIZE,
            sample_rows: 5,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_inference(mut self, engine: TypeInferenceEngine) -> Self {
        self.inference = engine;
        self
    }

    fn read_records(&self, bytes: &[u8]) -> Result<Vec<StringRecord>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(false)
            .from_reader(bytes);

        reader
            .records()
            .map(|record| record.map_err(|e| ProfilerError::parse(DataFormat::Csv, e.to_string())))
            .collect()
    }

    fn build_field(&self, name: String, index: usize, rows: &[StringRecord]) -> DataField {
        let column: Vec<&str> = rows.iter().map(|r| r.get(index).unwrap_or("")).collect();

        let window = &column[..column.len().min(self.inference_rows)];
        let field_type = self.inference.infer_column_type(window);

        let null_count = column.iter().filter(|v| v.trim().is_empty()).count() as u64;

        let mut field = DataField::new(name, field_type).with_null_count(null_count);
        if let Some(first) = column.first() {
            field = field.with_sample_value(*first);
        }

        if field_type == FieldType::Numeric {
            let (min, max) = numeric_bounds(&column);
            field = field.with_bounds(min, max);
        }
        field
    }
}

impl FormatParser for CsvParser {
    fn format(&self) -> DataFormat {
        DataFormat::Csv
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn parse(&self, bytes: &[u8]) -> Result<DataProfile> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ProfilerError::EmptyInput("empty CSV file".to_string()));
        }

        let records = self.read_records(bytes)?;
        let Some((header, rows)) = records.split_first() else {
            return Err(ProfilerError::EmptyInput("empty CSV file".to_string()));
        };

        let names = normalize_field_names(header.iter());
        let fields: Vec<DataField> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| self.build_field(name, i, rows))
            .collect();

        let cells: Vec<Vec<&str>> = rows.iter().map(|r| r.iter().collect()).collect();
        let data_quality_score = QualityScorer::score(&cells);

        let delimiter = char::from(self.delimiter).to_string();
        let sample_data = records
            .iter()
            .take(self.sample_rows)
            .map(|r| r.iter().collect::<Vec<_>>().join(&delimiter))
            .collect::<Vec<_>>()
            .join("\n");

        let total_rows = rows.len() as u64;
        debug!(
            total_rows,
            columns = fields.len(),
            quality = data_quality_score,
            "Profiled CSV input"
        );

        Ok(DataProfile {
            data_type: DataFormat::Csv,
            total_rows,
            sampled_rows: total_rows,
            fields,
            sample_data,
            data_quality_score,
            file_size: bytes.len() as u64,
            encoding: DataProfile::ENCODING.to_string(),
            delimiter: Some(delimiter),
            has_headers: true,
        })
    }
}

fn numeric_bounds(column: &[&str]) -> (Option<f64>, Option<f64>) {
    column
        .iter()
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .fold((None, None), |(min, max), v| {
            (
                Some(min.map_or(v, |m: f64| m.min(v))),
                Some(max.map_or(v, |m: f64| m.max(v))),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<DataProfile> {
        CsvParser::new().parse(input.as_bytes())
    }

    #[test]
    fn test_two_numeric_columns() {
        let profile = parse("a;b\n1;2\n3;4").unwrap();
        assert_eq!(profile.total_rows, 2);
        assert_eq!(profile.field_names(), vec!["a", "b"]);
        assert!(profile
            .fields
            .iter()
            .all(|f| f.field_type == FieldType::Numeric));
        assert_eq!(profile.data_quality_score, 1.0);
        assert_eq!(profile.delimiter.as_deref(), Some(";"));
        assert!(profile.has_headers);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(parse(""), Err(ProfilerError::EmptyInput(_))));
        assert!(matches!(parse("\n\n"), Err(ProfilerError::EmptyInput(_))));
    }

    #[test]
    fn test_header_only_yields_zero_rows() {
        let profile = parse("name;age\n").unwrap();
        assert_eq!(profile.total_rows, 0);
        assert_eq!(profile.data_quality_score, 0.0);
        assert_eq!(profile.fields.len(), 2);
        assert!(profile
            .fields
            .iter()
            .all(|f| f.field_type == FieldType::String && f.sample_value.is_none()));
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let err = parse("a;b\n1;2;3").unwrap_err();
        assert!(matches!(
            err,
            ProfilerError::Parse {
                format: DataFormat::Csv,
                ..
            }
        ));
    }

    #[test]
    fn test_field_statistics() {
        let profile = parse(" id ;score;joined\n1;;2024-01-01\n2;9.5;\n3;4;2024-02-01").unwrap();

        let id = profile.field("id").unwrap();
        assert_eq!(id.field_type, FieldType::Numeric);
        assert_eq!(id.sample_value.as_deref(), Some("1"));
        assert_eq!(id.min_value, Some(1.0));
        assert_eq!(id.max_value, Some(3.0));
        assert!(!id.nullable);

        let score = profile.field("score").unwrap();
        assert_eq!(score.field_type, FieldType::Numeric);
        assert_eq!(score.null_count, 1);
        assert!(score.nullable);
        assert_eq!(score.sample_value.as_deref(), Some(""));

        let joined = profile.field("joined").unwrap();
        assert_eq!(joined.field_type, FieldType::Timestamp);
        assert_eq!(joined.min_value, None);

        // 2 empty cells out of 9
        assert!((profile.data_quality_score - 7.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_inference_uses_first_five_rows_only() {
        let input = "code\nA\nB\nC\nD\nE\n42";
        let profile = parse(input).unwrap();
        assert_eq!(profile.fields[0].field_type, FieldType::String);
    }

    #[test]
    fn test_sample_data_has_header_and_four_rows() {
        let input = "n\n1\n2\n3\n4\n5\n6";
        let profile = parse(input).unwrap();
        assert_eq!(profile.sample_data, "n\n1\n2\n3\n4");
        assert_eq!(profile.total_rows, 6);
        assert_eq!(profile.sampled_rows, 6);
        assert_eq!(profile.file_size, input.len() as u64);
    }

    #[test]
    fn test_blank_and_duplicate_headers_stay_unique() {
        let profile = parse("a;;a\n1;2;3").unwrap();
        assert_eq!(profile.field_names(), vec!["a", "column_2", "a_2"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let profile = CsvParser::new()
            .with_delimiter(b',')
            .parse(b"x,y\ntrue,hello")
            .unwrap();
        assert_eq!(profile.fields[0].field_type, FieldType::Boolean);
        assert_eq!(profile.fields[1].field_type, FieldType::String);
        assert_eq!(profile.delimiter.as_deref(), Some(","));
    }
}
