//! Builders for the requests the orchestrator sends to the LLM.

use std::fmt::Write as _;

use super::{LlmRequest, OperationType, SourceConfig, TargetConfig};
use crate::core::{DataProfile, StorageSystem, TableSchema};

fn source_config(profile: &DataProfile, file_name: Option<&str>) -> SourceConfig {
    SourceConfig {
        source_type: profile.data_type.as_str().to_string(),
        file_name: file_name.map(str::to_string),
        total_rows: Some(profile.total_rows),
        quality_score: Some(profile.data_quality_score),
    }
}

fn type_list(profile: &DataProfile) -> String {
    profile
        .distinct_field_types()
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Asks for a free-text review of the profile.
///
/// The rule-based recommendations already derived are included so the model
/// can refine rather than repeat them.
pub fn analysis_request(
    profile: &DataProfile,
    recommendations: &[String],
    file_name: &str,
) -> LlmRequest {
    let mut query = String::new();
    let _ = writeln!(query, "Analyze the following data and give recommendations.");
    let _ = writeln!(query);
    let _ = writeln!(query, "DATA STRUCTURE:");
    let _ = writeln!(query, "- File: {file_name}");
    let _ = writeln!(query, "- Rows: {}", profile.total_rows);
    let _ = writeln!(query, "- Columns: {}", profile.fields.len());
    let _ = writeln!(query, "- File type: {}", profile.data_type);
    let _ = writeln!(query, "- Data quality: {:.2}", profile.data_quality_score);
    let _ = writeln!(query, "- Data types: {}", type_list(profile));
    let _ = writeln!(query);
    let _ = writeln!(query, "SAMPLE DATA:");
    let _ = writeln!(query, "{}", profile.sample_data);
    if !recommendations.is_empty() {
        let _ = writeln!(query);
        let _ = writeln!(query, "ALREADY RECOMMENDED:");
        for r in recommendations {
            let _ = writeln!(query, "- {r}");
        }
    }
    let _ = writeln!(query);
    let _ = writeln!(query, "Give detailed recommendations on:");
    let _ = writeln!(query, "1. Data quality (problems, anomalies, missing values)");
    let _ = writeln!(query, "2. The best storage (PostgreSQL, ClickHouse, HDFS)");
    let _ = writeln!(query, "3. Preprocessing (cleaning, transformation)");
    let _ = writeln!(query, "4. Analytics opportunities (statistics, visualization, ML)");
    let _ = write!(
        query,
        "Prefix each concrete recommendation with \"Recommendation:\" or a \"-\" list marker."
    );

    LlmRequest {
        user_query: query,
        source_config: source_config(profile, Some(file_name)),
        target_config: TargetConfig {
            target_type: "analysis".to_string(),
            table_name: None,
        },
        operation_type: OperationType::DataAnalysis,
        data_profile: Some(profile.clone()),
        model: None,
    }
}

/// Asks for a DDL script creating `schema` on `system`.
pub fn ddl_request(profile: &DataProfile, schema: &TableSchema, system: StorageSystem) -> LlmRequest {
    let mut query = format!(
        "Create a DDL script for table {} on {} based on the data profile.\n\nCOLUMNS:\n",
        schema.table_name, system
    );
    for field in &schema.fields {
        let _ = writeln!(
            query,
            "- {} {}{}{}",
            field.name,
            field.sql_type,
            if field.nullable { "" } else { " NOT NULL" },
            if field.indexed { " (indexed)" } else { "" }
        );
    }
    query.push_str("\nReturn only the SQL, without explanations.");

    LlmRequest {
        user_query: query,
        source_config: source_config(profile, None),
        target_config: TargetConfig {
            target_type: system.as_str().to_lowercase(),
            table_name: Some(schema.table_name.clone()),
        },
        operation_type: OperationType::DdlGeneration,
        data_profile: Some(profile.clone()),
        model: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::RecommendationEngine;
    use crate::sources::{CsvParser, FormatParser};

    fn profile() -> DataProfile {
        CsvParser::new()
            .parse(b"id;name;age\n1;John;30\n2;;25")
            .unwrap()
    }

    #[test]
    fn test_analysis_request_describes_profile() {
        let p = profile();
        let request = analysis_request(&p, &["High data quality".to_string()], "people.csv");

        assert_eq!(request.operation_type, OperationType::DataAnalysis);
        assert_eq!(request.source_config.source_type, "csv");
        assert_eq!(request.source_config.file_name.as_deref(), Some("people.csv"));
        assert_eq!(request.source_config.total_rows, Some(2));
        assert_eq!(request.target_config.target_type, "analysis");
        assert!(request.user_query.contains("- Rows: 2"));
        assert!(request.user_query.contains("- Columns: 3"));
        assert!(request.user_query.contains("numeric, string"));
        assert!(request.user_query.contains("- High data quality"));
        assert_eq!(request.data_profile.as_ref(), Some(&p));
    }

    #[test]
    fn test_ddl_request_targets_system() {
        let p = profile();
        let rec = RecommendationEngine::new().with_table_name("people").recommend(&p);
        let request = ddl_request(&p, &rec.schema, StorageSystem::ClickHouse);

        assert_eq!(request.operation_type, OperationType::DdlGeneration);
        assert_eq!(request.target_config.target_type, "clickhouse");
        assert_eq!(request.target_config.table_name.as_deref(), Some("people"));
        assert!(request.user_query.contains("- id DECIMAL(10,2) NOT NULL (indexed)"));
        assert!(request.user_query.contains("- name VARCHAR(255)\n"));
    }
}
