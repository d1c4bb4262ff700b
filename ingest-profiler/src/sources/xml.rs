//! XML well-formedness check.
//!
//! No structural analysis is done: a well-formed document yields a single
//! synthetic `xml_content` string field.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument};

use super::FormatParser;
use crate::core::{DataField, DataFormat, DataProfile, FieldType};
use crate::error::{ProfilerError, Result};

/// Fixed quality score reported for XML input.
pub const XML_QUALITY_SCORE: f64 = 0.8;

/// Name of the synthetic field produced for XML documents.
pub const XML_CONTENT_FIELD: &str = "xml_content";

#[derive(Debug, Clone, Default)]
pub struct XmlParser;

impl XmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Walks the document and returns the root element name.
    fn check_well_formed(bytes: &[u8]) -> Result<String> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut depth = 0usize;
        let mut root: Option<String> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                ProfilerError::parse(
                    DataFormat::Xml,
                    format!("{e} at position {}", reader.error_position()),
                )
            })?;

            match event {
                Event::Start(start) => {
                    if depth == 0 {
                        if root.is_some() {
                            return Err(ProfilerError::parse(
                                DataFormat::Xml,
                                "multiple root elements",
                            ));
                        }
                        root = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                    }
                    depth += 1;
                }
                Event::Empty(empty) => {
                    if depth == 0 {
                        if root.is_some() {
                            return Err(ProfilerError::parse(
                                DataFormat::Xml,
                                "multiple root elements",
                            ));
                        }
                        root = Some(String::from_utf8_lossy(empty.name().as_ref()).into_owned());
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                }
                Event::Text(text) if depth == 0 => {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(ProfilerError::parse(
                            DataFormat::Xml,
                            "text content outside the root element",
                        ));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if depth != 0 {
            return Err(ProfilerError::parse(
                DataFormat::Xml,
                "unexpected end of document",
            ));
        }
        root.ok_or_else(|| ProfilerError::parse(DataFormat::Xml, "document has no root element"))
    }
}

impl FormatParser for XmlParser {
    fn format(&self) -> DataFormat {
        DataFormat::Xml
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn parse(&self, bytes: &[u8]) -> Result<DataProfile> {
        let root = Self::check_well_formed(bytes)?;
        debug!(root = %root, "Profiled XML input");

        Ok(DataProfile {
            data_type: DataFormat::Xml,
            total_rows: 1,
            sampled_rows: 1,
            fields: vec![DataField::new(XML_CONTENT_FIELD, FieldType::String)],
            sample_data: String::from_utf8_lossy(bytes).into_owned(),
            data_quality_score: XML_QUALITY_SCORE,
            file_size: bytes.len() as u64,
            encoding: DataProfile::ENCODING.to_string(),
            delimiter: None,
            has_headers: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<DataProfile> {
        XmlParser::new().parse(input.as_bytes())
    }

    #[test]
    fn test_well_formed_document() {
        let input = r#"<?xml version="1.0"?><people><person id="1">John</person><empty/></people>"#;
        let profile = parse(input).unwrap();

        assert_eq!(profile.fields.len(), 1);
        let field = &profile.fields[0];
        assert_eq!(field.name, "xml_content");
        assert_eq!(field.field_type, FieldType::String);
        assert!(!field.nullable);
        assert_eq!(profile.total_rows, 1);
        assert_eq!(profile.data_quality_score, XML_QUALITY_SCORE);
        assert_eq!(profile.sample_data, input);
    }

    #[test]
    fn test_self_closing_root() {
        assert!(parse("<root/>").is_ok());
    }

    #[test]
    fn test_mismatched_tags_rejected() {
        let err = parse("<a><b></a>").unwrap_err();
        assert!(matches!(
            err,
            ProfilerError::Parse {
                format: DataFormat::Xml,
                ..
            }
        ));
    }

    #[test]
    fn test_unclosed_and_empty_documents_rejected() {
        assert!(parse("<a><b></b>").is_err());
        assert!(parse("").is_err());
        assert!(parse("just text").is_err());
    }

    #[test]
    fn test_multiple_roots_rejected() {
        assert!(parse("<a/><b/>").is_err());
    }
}
