//! Combines the recommendation rules, storage decision and schema derivation.

use tracing::{info, instrument};

use super::schema::SchemaDeriver;
use super::storage::StorageAdvisor;
use super::suggestions::SuggestionRules;
use crate::core::{DataProfile, Recommendation};

/// Derives every recommendation output from a single profile.
///
/// All steps are pure computations over the profile, so `recommend` is total.
///
/// # Example
///
/// ```rust
/// use ingest_profiler::analyzers::RecommendationEngine;
/// use ingest_profiler::core::StorageSystem;
/// use ingest_profiler::sources::{CsvParser, FormatParser};
///
/// let profile = CsvParser::new().parse(b"name;age\nJohn;30\nJane;25").unwrap();
/// let out = RecommendationEngine::new().recommend(&profile);
///
/// assert_eq!(out.storage.primary_storage, StorageSystem::PostgreSQL);
/// assert_eq!(out.schema.fields.len(), profile.fields.len());
/// ```
pub struct RecommendationEngine {
    rules: SuggestionRules,
    storage: StorageAdvisor,
    schema: SchemaDeriver,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            rules: SuggestionRules::new(),
            storage: StorageAdvisor::new(),
            schema: SchemaDeriver::default(),
        }
    }

    pub fn with_rules(mut self, rules: SuggestionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.schema = SchemaDeriver::new(table_name);
        self
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    #[instrument(skip(self, profile), fields(format = %profile.data_type, rows = profile.total_rows))]
    pub fn recommend(&self, profile: &DataProfile) -> Recommendation {
        let recommendations = self.rules.recommend(profile);
        let storage = self.storage.recommend(profile);
        let schema = self.schema.derive(profile);
        let ddl_metadata = self.schema.ddl_metadata(profile);

        info!(
            primary = %storage.primary_storage,
            recommendations = recommendations.len(),
            indexes = schema.indexes.len(),
            "Derived recommendations"
        );

        Recommendation {
            recommendations,
            storage,
            schema,
            ddl_metadata,
        }
    }
}
