//! Profiling analyzers: type inference, quality scoring and recommendations.
//!
//! - [`inference`]: per-column type detection from raw cell values
//! - [`quality`]: completeness ratio and profile-level quality adjustment
//! - [`suggestions`]: rule-based free-text recommendations
//! - [`storage`]: storage-system decision table
//! - [`schema`]: target table schema and DDL metadata
//! - [`recommender`]: [`RecommendationEngine`] combining the three above

pub mod inference;
pub mod quality;
pub mod recommender;
pub mod schema;
pub mod storage;
pub mod suggestions;

pub use inference::{InferenceConfig, TypeInferenceEngine, TypeInferenceEngineBuilder};
pub use quality::{QualityBonuses, QualityScorer};
pub use recommender::RecommendationEngine;
pub use schema::SchemaDeriver;
pub use storage::StorageAdvisor;
pub use suggestions::{RecommendationRule, SuggestionRules};
