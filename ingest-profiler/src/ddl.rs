//! Deterministic DDL rendering for the derived [`TableSchema`].
//!
//! Used whenever the LLM is unavailable or fails to generate a script.
//! Every identifier goes through [`SqlIdentifier::quote`].

use std::fmt::Write as _;

use crate::core::{StorageSystem, TableField, TableSchema};
use crate::error::{ProfilerError, Result};
use crate::security::{SqlDialect, SqlIdentifier};

/// Renders `CREATE TABLE` DDL for `schema` on `system`.
///
/// HDFS tables are rendered as Hive external Parquet tables located at
/// `/data/<table>`.
///
/// # Examples
///
/// ```rust
/// use ingest_profiler::analyzers::RecommendationEngine;
/// use ingest_profiler::core::StorageSystem;
/// use ingest_profiler::ddl;
/// use ingest_profiler::sources::{CsvParser, FormatParser};
///
/// let profile = CsvParser::new().parse(b"id;name\n1;John").unwrap();
/// let schema = RecommendationEngine::new().recommend(&profile).schema;
///
/// let sql = ddl::render(&schema, StorageSystem::PostgreSQL).unwrap();
/// assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"analyzed_data\""));
/// assert!(sql.contains("PRIMARY KEY (\"id\")"));
/// ```
pub fn render(schema: &TableSchema, system: StorageSystem) -> Result<String> {
    if schema.fields.is_empty() {
        return Err(ProfilerError::Internal(format!(
            "cannot render DDL for table '{}' without columns",
            schema.table_name
        )));
    }
    match system {
        StorageSystem::PostgreSQL => render_postgres(schema),
        StorageSystem::ClickHouse => render_clickhouse(schema),
        StorageSystem::Hdfs => render_hive(schema),
    }
}

/// The column a CHECK expression starts with, if it names one of the fields.
fn constrained_column<'a>(schema: &'a TableSchema, expression: &str) -> Option<&'a TableField> {
    let token: String = expression
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    schema.field(&token)
}

fn render_postgres(schema: &TableSchema) -> Result<String> {
    let d = SqlDialect::Postgres;
    let table = SqlIdentifier::quote(&schema.table_name, d)?;

    let mut lines = Vec::with_capacity(schema.fields.len() + 2);
    for field in &schema.fields {
        let mut line = format!(
            "    {} {}",
            SqlIdentifier::quote(&field.name, d)?,
            field.sql_type
        );
        if !field.nullable {
            line.push_str(" NOT NULL");
        }
        lines.push(line);
    }

    let pk_present = !schema.primary_key.is_empty()
        && schema.primary_key.iter().all(|c| schema.field(c).is_some());
    if pk_present {
        let cols = schema
            .primary_key
            .iter()
            .map(|c| SqlIdentifier::quote(c, d))
            .collect::<Result<Vec<_>>>()?;
        lines.push(format!("    PRIMARY KEY ({})", cols.join(", ")));
    }

    for constraint in &schema.constraints {
        if constraint.constraint_type.eq_ignore_ascii_case("CHECK")
            && constrained_column(schema, &constraint.expression).is_some()
        {
            lines.push(format!(
                "    CONSTRAINT {} CHECK ({})",
                SqlIdentifier::quote(&constraint.name, d)?,
                constraint.expression
            ));
        }
    }

    let mut sql = format!("CREATE TABLE IF NOT EXISTS {table} (\n{}\n);\n", lines.join(",\n"));

    for index in &schema.indexes {
        let cols = index
            .fields
            .iter()
            .map(|c| SqlIdentifier::quote(c, d))
            .collect::<Result<Vec<_>>>()?;
        let _ = writeln!(
            sql,
            "CREATE INDEX IF NOT EXISTS {} ON {table} USING {} ({});",
            SqlIdentifier::quote(&index.name, d)?,
            index.index_type.to_uppercase(),
            cols.join(", ")
        );
    }

    Ok(sql)
}

fn clickhouse_type(sql_type: &str) -> &'static str {
    match sql_type {
        "DECIMAL(10,2)" => "Decimal(10, 2)",
        "TIMESTAMP" => "DateTime",
        "BOOLEAN" => "Bool",
        _ => "String",
    }
}

fn render_clickhouse(schema: &TableSchema) -> Result<String> {
    let d = SqlDialect::ClickHouse;
    let table = SqlIdentifier::quote(&schema.table_name, d)?;

    let columns = schema
        .fields
        .iter()
        .map(|field| {
            let base = clickhouse_type(&field.sql_type);
            let ty = if field.nullable {
                format!("Nullable({base})")
            } else {
                base.to_string()
            };
            Ok(format!("    {} {ty}", SqlIdentifier::quote(&field.name, d)?))
        })
        .collect::<Result<Vec<_>>>()?;

    // sorting keys cannot be Nullable
    let order_by = schema
        .fields
        .iter()
        .filter(|f| f.indexed && !f.nullable)
        .map(|f| SqlIdentifier::quote(&f.name, d))
        .collect::<Result<Vec<_>>>()?;
    let order_by = if order_by.is_empty() {
        "tuple()".to_string()
    } else {
        format!("({})", order_by.join(", "))
    };

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table}\n(\n{}\n)\nENGINE = MergeTree\nORDER BY {order_by};\n",
        columns.join(",\n")
    ))
}

fn hive_type(sql_type: &str) -> &str {
    match sql_type {
        "VARCHAR(255)" | "TEXT" => "STRING",
        other => other,
    }
}

fn render_hive(schema: &TableSchema) -> Result<String> {
    let d = SqlDialect::Hive;
    let table = SqlIdentifier::quote(&schema.table_name, d)?;

    let columns = schema
        .fields
        .iter()
        .map(|field| {
            Ok(format!(
                "    {} {}",
                SqlIdentifier::quote(&field.name, d)?,
                hive_type(&field.sql_type)
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "CREATE EXTERNAL TABLE IF NOT EXISTS {table} (\n{}\n)\nSTORED AS PARQUET\nLOCATION {};\n",
        columns.join(",\n"),
        SqlIdentifier::quote_literal(&format!("/data/{}", schema.table_name))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TableConstraint, TableIndex};

    fn field(name: &str, sql_type: &str, nullable: bool, indexed: bool) -> TableField {
        TableField {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable,
            indexed,
            description: None,
        }
    }

    fn schema(fields: Vec<TableField>) -> TableSchema {
        let indexes = fields
            .iter()
            .filter(|f| f.indexed)
            .map(|f| TableIndex {
                name: format!("idx_{}", f.name),
                fields: vec![f.name.clone()],
                index_type: "btree".to_string(),
            })
            .collect();
        TableSchema {
            table_name: "events".to_string(),
            fields,
            primary_key: vec!["id".to_string()],
            indexes,
            constraints: vec![TableConstraint {
                name: "chk_data_quality".to_string(),
                constraint_type: "CHECK".to_string(),
                expression: "data_quality_score > 0".to_string(),
            }],
        }
    }

    #[test]
    fn test_postgres_full_table() {
        let s = schema(vec![
            field("id", "DECIMAL(10,2)", false, true),
            field("name", "VARCHAR(255)", true, false),
            field("data_quality_score", "DECIMAL(10,2)", false, false),
        ]);
        let sql = render(&s, StorageSystem::PostgreSQL).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"events\" (\n\
             \x20   \"id\" DECIMAL(10,2) NOT NULL,\n\
             \x20   \"name\" VARCHAR(255),\n\
             \x20   \"data_quality_score\" DECIMAL(10,2) NOT NULL,\n\
             \x20   PRIMARY KEY (\"id\"),\n\
             \x20   CONSTRAINT \"chk_data_quality\" CHECK (data_quality_score > 0)\n\
             );\n\
             CREATE INDEX IF NOT EXISTS \"idx_id\" ON \"events\" USING BTREE (\"id\");\n"
        );
    }

    #[test]
    fn test_postgres_skips_dangling_key_and_check() {
        let s = schema(vec![field("name", "VARCHAR(255)", false, false)]);
        let sql = render(&s, StorageSystem::PostgreSQL).unwrap();
        assert!(!sql.contains("PRIMARY KEY"));
        assert!(!sql.contains("CHECK"));
        assert!(!sql.contains("CREATE INDEX"));
    }

    #[test]
    fn test_clickhouse_nullable_and_order_by() {
        let s = schema(vec![
            field("id", "DECIMAL(10,2)", false, true),
            field("created_at", "TIMESTAMP", true, true),
            field("active", "BOOLEAN", false, false),
        ]);
        let sql = render(&s, StorageSystem::ClickHouse).unwrap();
        assert!(sql.contains("`id` Decimal(10, 2),"));
        assert!(sql.contains("`created_at` Nullable(DateTime),"));
        assert!(sql.contains("`active` Bool\n"));
        assert!(sql.contains("ENGINE = MergeTree\nORDER BY (`id`);"));
    }

    #[test]
    fn test_clickhouse_without_keys_orders_by_tuple() {
        let s = schema(vec![field("name", "VARCHAR(255)", true, false)]);
        let sql = render(&s, StorageSystem::ClickHouse).unwrap();
        assert!(sql.ends_with("ORDER BY tuple();\n"));
    }

    #[test]
    fn test_hive_external_parquet() {
        let s = schema(vec![
            field("name", "VARCHAR(255)", true, false),
            field("payload", "TEXT", true, false),
        ]);
        let sql = render(&s, StorageSystem::Hdfs).unwrap();
        assert!(sql.starts_with("CREATE EXTERNAL TABLE IF NOT EXISTS `events` ("));
        assert!(sql.contains("`name` STRING,\n    `payload` STRING\n"));
        assert!(sql.contains("STORED AS PARQUET\nLOCATION '/data/events';"));
    }

    #[test]
    fn test_hostile_column_names_are_quoted() {
        let s = schema(vec![field("x\"; DROP TABLE users; --", "TEXT", true, false)]);
        let sql = render(&s, StorageSystem::PostgreSQL).unwrap();
        assert!(sql.contains("\"x\"\"; DROP TABLE users; --\" TEXT"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(render(&schema(vec![]), StorageSystem::PostgreSQL).is_err());
    }
}
