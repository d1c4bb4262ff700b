//! # ingest-profiler - Profiling and storage recommendations for uploaded data
//!
//! ingest-profiler reads CSV, JSON and XML uploads, infers a column type for
//! every field, scores data quality and recommends where the data should live
//! (PostgreSQL, ClickHouse or HDFS) together with a table schema and DDL.
//!
//! ## Quick Start
//!
//! ```rust
//! use ingest_profiler::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let runner = AnalysisRunner::new(PipelineConfig::default());
//! let result = runner
//!     .run(AnalysisRequest::from_bytes(
//!         "user_1",
//!         "people.csv",
//!         "name;age\nJohn;30\nJane;25",
//!     ))
//!     .await;
//!
//! assert_eq!(result.status, AnalysisStatus::Completed);
//!
//! let profile = result.data_profile.as_ref().unwrap();
//! assert_eq!(profile.total_rows, 2);
//! assert_eq!(profile.fields[1].field_type, FieldType::Numeric);
//! assert_eq!(profile.data_quality_score, 1.0);
//!
//! println!("{}", MarkdownFormatter::new().format(&result).unwrap());
//! # }
//! ```
//!
//! ## Profiling without the pipeline
//!
//! The parsers and the recommendation engine are plain synchronous code:
//!
//! ```rust
//! use ingest_profiler::analyzers::RecommendationEngine;
//! use ingest_profiler::core::StorageSystem;
//! use ingest_profiler::sources::{CsvParser, FormatParser};
//!
//! let profile = CsvParser::new().parse(b"id;created_at\n1;2024-01-01").unwrap();
//! let recommendation = RecommendationEngine::new().recommend(&profile);
//!
//! assert_eq!(recommendation.storage.primary_storage, StorageSystem::PostgreSQL);
//! assert_eq!(recommendation.schema.fields.len(), profile.fields.len());
//! ```
//!
//! ## Architecture
//!
//! - **`sources`**: CSV, JSON and XML parsers producing a [`core::DataProfile`]
//! - **`analyzers`**: type inference, quality scoring, storage advice, schema derivation
//! - **`pipeline`**: the analysis state machine, run inline or on a background worker
//! - **`store`**, **`llm`**, **`workflow`**, **`repository`**: capabilities
//!   the pipeline talks to, each behind an async trait
//! - **`ddl`**: deterministic `CREATE TABLE` rendering
//! - **`formatters`**: JSON, Markdown and terminal reports
//!
//! ## Features
//!
//! - `cloud-storage` (default): `object_store` backed local filesystem storage
//! - `s3`: S3 and MinIO through `object_store`
//! - `llm` (default): HTTP client for the LLM service
//! - `airflow` (default): Airflow REST API workflow trigger

pub mod analyzers;
pub mod config;
pub mod core;
pub mod ddl;
pub mod error;
pub mod formatters;
pub mod ids;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod repository;
pub mod security;
pub mod sources;
pub mod store;
pub mod workflow;
