//! Format parsers turning raw upload bytes into a [`DataProfile`].
//!
//! Each supported format has one parser implementing [`FormatParser`]:
//!
//! - [`CsvParser`]: semicolon-delimited, header row required, type inference per column
//! - [`JsonParser`]: fields from the root object (or first array element)
//! - [`XmlParser`]: well-formedness check with a single synthetic field
//!
//! [`ParserSet`] dispatches on a detected [`DataFormat`].
//!
//! # Example
//!
//! ```rust
//! use ingest_profiler::sources::{detect_format, ParserSet};
//!
//! let format = detect_format("people.csv", None).unwrap();
//! let profile = ParserSet::new()
//!     .parse(format, b"name;age\nJohn;30\nJane;25")
//!     .unwrap();
//! assert_eq!(profile.total_rows, 2);
//! ```

pub mod csv;
pub mod json;
pub mod xml;

pub use self::csv::CsvParser;
pub use self::json::JsonParser;
pub use self::xml::XmlParser;

use crate::analyzers::inference::TypeInferenceEngine;
use crate::core::{DataFormat, DataProfile};
use crate::error::{ProfilerError, Result};

/// Turns raw bytes of one format into a profile. All errors are reported.
pub trait FormatParser: Send + Sync {
    fn format(&self) -> DataFormat;

    fn parse(&self, bytes: &[u8]) -> Result<DataProfile>;
}

/// Detects the format from the filename, falling back to `fallback` when the
/// extension is not recognised.
pub fn detect_format(filename: &str, fallback: Option<DataFormat>) -> Result<DataFormat> {
    DataFormat::from_filename(filename)
        .or(fallback)
        .ok_or_else(|| ProfilerError::UnsupportedFormat {
            filename: filename.to_string(),
        })
}

/// Trimmed field names. Blank names become `column_<n>` and repeats get a
/// `_<n>` suffix so names stay unique within the profile.
pub(crate) fn normalize_field_names<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut names: Vec<String> = Vec::new();
    for (i, raw) in raw.into_iter().enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", i + 1)
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut n = 2;
        while names.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

/// One parser per supported format.
#[derive(Debug, Clone, Default)]
pub struct ParserSet {
    csv: CsvParser,
    json: JsonParser,
    xml: XmlParser,
}

impl ParserSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given inference engine for CSV columns.
    pub fn with_inference(mut self, engine: TypeInferenceEngine) -> Self {
        self.csv = self.csv.with_inference(engine);
        self
    }

    pub fn with_csv_parser(mut self, parser: CsvParser) -> Self {
        self.csv = parser;
        self
    }

    pub fn parser(&self, format: DataFormat) -> &dyn FormatParser {
        match format {
            DataFormat::Csv => &self.csv,
            DataFormat::Json => &self.json,
            DataFormat::Xml => &self.xml,
        }
    }

    pub fn parse(&self, format: DataFormat, bytes: &[u8]) -> Result<DataProfile> {
        self.parser(format).parse(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_prefers_extension() {
        assert_eq!(
            detect_format("data.json", Some(DataFormat::Csv)).unwrap(),
            DataFormat::Json
        );
    }

    #[test]
    fn test_detect_format_uses_fallback() {
        assert_eq!(
            detect_format("upload.bin", Some(DataFormat::Xml)).unwrap(),
            DataFormat::Xml
        );
    }

    #[test]
    fn test_detect_format_unknown_without_fallback() {
        let err = detect_format("upload.bin", None).unwrap_err();
        assert!(matches!(err, ProfilerError::UnsupportedFormat { .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_normalize_field_names() {
        assert_eq!(
            normalize_field_names([" id ", "", "id", "  ", "id"]),
            vec!["id", "column_2", "id_2", "column_4", "id_3"]
        );
        assert!(normalize_field_names(std::iter::empty::<&str>()).is_empty());
    }

    #[test]
    fn test_parser_dispatch() {
        let parsers = ParserSet::new();
        for format in [DataFormat::Csv, DataFormat::Json, DataFormat::Xml] {
            assert_eq!(parsers.parser(format).format(), format);
        }
        let profile = parsers.parse(DataFormat::Json, br#"{"a": 1}"#).unwrap();
        assert_eq!(profile.data_type, DataFormat::Json);
    }
}
