//! Rule-based free-text recommendations for a profiled dataset.
//!
//! ## Architecture
//!
//! - `RecommendationRule` trait for implementing one family of advice
//! - Individual rules for quality tier, volume tier, source format and content
//! - `SuggestionRules` for evaluating rules in order and concatenating their output
//!
//! Rules are not mutually exclusive: every applicable rule appends its text,
//! in the order the rules were registered.

use tracing::{debug, instrument};

use crate::core::{DataFormat, DataProfile, FieldType};

/// Recommendation texts produced by the default rules.
pub mod messages {
    pub const LOW_QUALITY: &str = "Low data quality: cleaning needed before loading";
    pub const MEDIUM_QUALITY: &str = "Medium data quality: anomaly check advised";
    pub const HIGH_QUALITY: &str = "High data quality: ready to use";
    pub const LARGE_VOLUME: &str = "Large data volume: partition the target table";
    pub const MEDIUM_VOLUME: &str = "Medium data volume: index frequently queried fields";
    pub const VALIDATE_DELIMITERS: &str = "CSV source: validate delimiters and quoting";
    pub const VALIDATE_STRUCTURE: &str = "JSON source: validate document structure";
    pub const VALIDATE_SCHEMA: &str = "XML source: validate against the XML schema";
    pub const STATISTICAL_ANALYSIS: &str = "Numeric fields present: statistical analysis recommended";
    pub const TEXT_ANALYSIS: &str = "String fields present: text analysis recommended";
}

/// Trait for implementing recommendation rules
pub trait RecommendationRule: Send + Sync {
    /// Apply this rule to a profile and return zero or more recommendations
    fn apply(&self, profile: &DataProfile) -> Vec<String>;

    /// Get a human-readable name for this rule
    fn name(&self) -> &str;

    /// Get a description of what this rule analyzes
    fn description(&self) -> &str;
}

/// Ordered collection of recommendation rules
pub struct SuggestionRules {
    rules: Vec<Box<dyn RecommendationRule>>,
}

impl SuggestionRules {
    /// Create an empty rule set
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create the default rule set: quality, volume, format, content
    pub fn new() -> Self {
        Self::empty()
            .add_rule(Box::new(QualityTierRule::new()))
            .add_rule(Box::new(VolumeTierRule::new()))
            .add_rule(Box::new(FormatRule))
            .add_rule(Box::new(ContentRule))
    }

    /// Add a recommendation rule after the existing ones
    pub fn add_rule(mut self, rule: Box<dyn RecommendationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Evaluate every rule in order
    #[instrument(skip(self, profile), fields(rows = profile.total_rows))]
    pub fn recommend(&self, profile: &DataProfile) -> Vec<String> {
        let mut all = Vec::new();
        for rule in &self.rules {
            let produced = rule.apply(profile);
            debug!(
                rule = rule.name(),
                count = produced.len(),
                "Applied recommendation rule"
            );
            all.extend(produced);
        }
        all
    }
}

impl Default for SuggestionRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Quality tier from the profile's base score
pub struct QualityTierRule {
    low_threshold: f64,
    high_threshold: f64,
}

impl QualityTierRule {
    /// Tiers `< 0.7`, `[0.7, 0.9)` and `>= 0.9`
    pub fn new() -> Self {
        Self {
            low_threshold: 0.7,
            high_threshold: 0.9,
        }
    }

    pub fn with_thresholds(low: f64, high: f64) -> Self {
        Self {
            low_threshold: low.clamp(0.0, 1.0),
            high_threshold: high.clamp(0.0, 1.0),
        }
    }
}

impl Default for QualityTierRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRule for QualityTierRule {
    fn apply(&self, profile: &DataProfile) -> Vec<String> {
        let score = profile.data_quality_score;
        let text = if score < self.low_threshold {
            messages::LOW_QUALITY
        } else if score < self.high_threshold {
            messages::MEDIUM_QUALITY
        } else {
            messages::HIGH_QUALITY
        };
        vec![text.to_string()]
    }

    fn name(&self) -> &str {
        "QualityTierRule"
    }

    fn description(&self) -> &str {
        "Grades the completeness score into low, medium and high quality tiers"
    }
}

/// Volume tier from the row count
pub struct VolumeTierRule {
    large_rows: u64,
    medium_rows: u64,
}

impl VolumeTierRule {
    /// Large above 1,000,000 rows, medium above 100,000
    pub fn new() -> Self {
        Self {
            large_rows: 1_000_000,
            medium_rows: 100_000,
        }
    }
}

impl Default for VolumeTierRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRule for VolumeTierRule {
    fn apply(&self, profile: &DataProfile) -> Vec<String> {
        if profile.total_rows > self.large_rows {
            vec![messages::LARGE_VOLUME.to_string()]
        } else if profile.total_rows > self.medium_rows {
            vec![messages::MEDIUM_VOLUME.to_string()]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "VolumeTierRule"
    }

    fn description(&self) -> &str {
        "Suggests partitioning or indexing for large row counts"
    }
}

/// Format-specific validation advice
pub struct FormatRule;

impl RecommendationRule for FormatRule {
    fn apply(&self, profile: &DataProfile) -> Vec<String> {
        let text = match profile.data_type {
            DataFormat::Csv => messages::VALIDATE_DELIMITERS,
            DataFormat::Json => messages::VALIDATE_STRUCTURE,
            DataFormat::Xml => messages::VALIDATE_SCHEMA,
        };
        vec![text.to_string()]
    }

    fn name(&self) -> &str {
        "FormatRule"
    }

    fn description(&self) -> &str {
        "Adds source-format validation advice"
    }
}

/// Analysis advice from the field types present
pub struct ContentRule;

impl RecommendationRule for ContentRule {
    fn apply(&self, profile: &DataProfile) -> Vec<String> {
        let mut out = Vec::new();
        if profile.has_field_type(FieldType::Numeric) {
            out.push(messages::STATISTICAL_ANALYSIS.to_string());
        }
        if profile.has_field_type(FieldType::String) {
            out.push(messages::TEXT_ANALYSIS.to_string());
        }
        out
    }

    fn name(&self) -> &str {
        "ContentRule"
    }

    fn description(&self) -> &str {
        "Suggests statistical or text analysis based on field types"
    }
}
