//! Report rendering for analysis results.
//!
//! Three formatters share the [`ResultFormatter`] trait: structured JSON for
//! programs, Markdown for documentation, and a compact summary for terminals.
//!
//! # Examples
//!
//! ```rust
//! use ingest_profiler::config::PipelineConfig;
//! use ingest_profiler::formatters::{HumanFormatter, ResultFormatter};
//! use ingest_profiler::pipeline::{AnalysisRequest, AnalysisRunner};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let runner = AnalysisRunner::new(PipelineConfig::default());
//! let result = runner
//!     .run(AnalysisRequest::from_bytes("user_1", "people.csv", "name;age\nJohn;30"))
//!     .await;
//!
//! let report = HumanFormatter::new().format(&result).unwrap();
//! assert!(report.contains("Analysis COMPLETED"));
//! # }
//! ```

use std::fmt::{self, Write};

use serde_json::Value;

use crate::core::{AnalysisResult, AnalysisStatus, DdlSource};
use crate::error::{ProfilerError, Result};

/// Which sections of a report are rendered.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Per-field profile table
    pub include_profile: bool,
    /// Derived table schema
    pub include_schema: bool,
    /// Generated DDL script
    pub include_ddl: bool,
    /// LLM analysis text and mined recommendations
    pub include_llm: bool,
    /// Cap on listed recommendations (`None` for all)
    pub max_recommendations: Option<usize>,
    /// ANSI colours in the human formatter
    pub use_colors: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_profile: true,
            include_schema: true,
            include_ddl: true,
            include_llm: true,
            max_recommendations: None,
            use_colors: true,
        }
    }
}

impl ReportConfig {
    /// Status, storage decision and recommendations only.
    pub fn minimal() -> Self {
        Self {
            include_profile: false,
            include_schema: false,
            include_ddl: false,
            include_llm: false,
            max_recommendations: Some(5),
            use_colors: false,
        }
    }

    /// Everything, no colours; for logs and CI output.
    pub fn plain() -> Self {
        Self {
            use_colors: false,
            ..Self::default()
        }
    }

    pub fn with_ddl(mut self, include: bool) -> Self {
        self.include_ddl = include;
        self
    }

    pub fn with_llm(mut self, include: bool) -> Self {
        self.include_llm = include;
        self
    }

    pub fn with_max_recommendations(mut self, max: usize) -> Self {
        self.max_recommendations = Some(max);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn recommendations<'a>(&self, all: &'a [String]) -> &'a [String] {
        match self.max_recommendations {
            Some(max) => &all[..max.min(all.len())],
            None => all,
        }
    }
}

/// Renders an [`AnalysisResult`] as text.
pub trait ResultFormatter {
    fn format(&self, result: &AnalysisResult) -> Result<String>;

    /// Formats with an explicit configuration. The default ignores it.
    fn format_with_config(&self, result: &AnalysisResult, _config: &ReportConfig) -> Result<String> {
        self.format(result)
    }
}

fn render_error(e: fmt::Error) -> ProfilerError {
    ProfilerError::Internal(format!("Failed to render report: {e}"))
}

/// The full result as JSON, minus the sections the config excludes.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: ReportConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: ReportConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: ReportConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, result: &AnalysisResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(&self, result: &AnalysisResult, config: &ReportConfig) -> Result<String> {
        let mut value = serde_json::to_value(result)?;
        if let Value::Object(map) = &mut value {
            if !config.include_profile {
                map.remove("data_profile");
            }
            if !config.include_schema {
                map.remove("table_schema");
                map.remove("ddl_metadata");
            }
            if !config.include_ddl {
                map.remove("ddl_script");
                map.remove("ddl_source");
            }
            if !config.include_llm {
                map.remove("llm_analysis");
                map.remove("llm_recommendations");
            }
            if let Some(max) = config.max_recommendations {
                if let Some(Value::Array(items)) = map.get_mut("recommendations") {
                    items.truncate(max);
                }
            }
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        json.map_err(|e| ProfilerError::Internal(format!("Failed to serialize result to JSON: {e}")))
    }
}

/// A short terminal summary.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: ReportConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: ReportConfig::default(),
        }
    }

    pub fn with_config(config: ReportConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, result: &AnalysisResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(&self, result: &AnalysisResult, config: &ReportConfig) -> Result<String> {
        let mut out = String::new();
        write_human(&mut out, result, config).map_err(render_error)?;
        Ok(out)
    }
}

fn paint(text: &str, color: &str, config: &ReportConfig) -> String {
    if config.use_colors {
        format!("\x1b[{color}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn write_human(out: &mut String, result: &AnalysisResult, config: &ReportConfig) -> fmt::Result {
    let headline = format!("Analysis {}", result.status.as_str().to_uppercase());
    let headline = match result.status {
        AnalysisStatus::Completed => paint(&headline, "32", config),
        AnalysisStatus::Failed => paint(&headline, "31", config),
        _ => paint(&headline, "33", config),
    };
    writeln!(out)?;
    writeln!(out, "{headline}")?;
    writeln!(out, "File: {} ({})", result.file_name, result.analysis_id)?;

    if let Some(error) = &result.error {
        writeln!(out, "Error: {error}")?;
    }

    if let Some(profile) = &result.data_profile {
        writeln!(out)?;
        writeln!(
            out,
            "Rows: {}  Columns: {}  Format: {}",
            profile.total_rows,
            profile.fields.len(),
            profile.data_type
        )?;
        write!(out, "Quality: {:.2}", profile.data_quality_score)?;
        if let Some(adjusted) = result.adjusted_quality_score {
            write!(out, " (adjusted {adjusted:.2})")?;
        }
        writeln!(out)?;

        if config.include_profile {
            for field in &profile.fields {
                let nullable = if field.nullable { ", nullable" } else { "" };
                writeln!(out, "   {} : {}{nullable}", field.name, field.field_type)?;
            }
        }
    }

    if let Some(storage) = &result.storage_recommendation {
        writeln!(out)?;
        let secondary = storage
            .secondary_storage
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "Storage: {} (alternatives: {secondary})",
            paint(storage.primary_storage.as_str(), "1", config)
        )?;
        writeln!(out, "   {}", storage.reasoning.rationale)?;
    }

    let recommendations = config.recommendations(&result.recommendations);
    if !recommendations.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recommendations:")?;
        for r in recommendations {
            writeln!(out, "   - {r}")?;
        }
        let hidden = result.recommendations.len() - recommendations.len();
        if hidden > 0 {
            writeln!(out, "   ... and {hidden} more")?;
        }
    }

    if config.include_llm && !result.llm_recommendations.is_empty() {
        writeln!(out)?;
        writeln!(out, "Model suggestions:")?;
        for r in &result.llm_recommendations {
            writeln!(out, "   - {r}")?;
        }
    }

    if config.include_ddl {
        if let Some(script) = &result.ddl_script {
            writeln!(out)?;
            writeln!(out, "DDL ({}):", ddl_origin(result.ddl_source))?;
            writeln!(out, "{}", script.trim_end())?;
        }
    }

    writeln!(out)
}

fn ddl_origin(source: Option<DdlSource>) -> &'static str {
    match source {
        Some(DdlSource::Llm) => "generated by model",
        _ => "rendered",
    }
}

/// A Markdown document for sharing or committing next to the data.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: ReportConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: ReportConfig::plain(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: ReportConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, result: &AnalysisResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(&self, result: &AnalysisResult, config: &ReportConfig) -> Result<String> {
        let mut out = String::new();
        write_markdown(&mut out, result, config, self.heading_level).map_err(render_error)?;
        Ok(out)
    }
}

/// Pipes would split a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn write_markdown(
    out: &mut String,
    result: &AnalysisResult,
    config: &ReportConfig,
    level: u8,
) -> fmt::Result {
    let h = "#".repeat(level as usize);
    let sub = "#".repeat(level as usize + 1);

    writeln!(out, "{h} Analysis Report: {}", result.file_name)?;
    writeln!(out)?;
    writeln!(out, "- **Status:** {}", result.status)?;
    writeln!(out, "- **Analysis:** `{}`", result.analysis_id)?;
    writeln!(out, "- **File:** `{}`", result.file_id)?;
    writeln!(out, "- **Created:** {}", result.created_at.to_rfc3339())?;
    if let Some(completed_at) = result.completed_at {
        writeln!(out, "- **Finished:** {}", completed_at.to_rfc3339())?;
    }
    if let Some(error) = &result.error {
        writeln!(out, "- **Error:** {error}")?;
    }
    if let Some(run_id) = &result.workflow_run_id {
        writeln!(out, "- **Workflow run:** `{run_id}`")?;
    }

    if let Some(profile) = &result.data_profile {
        writeln!(out)?;
        writeln!(out, "{sub} Profile")?;
        writeln!(out)?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Format | {} |", profile.data_type)?;
        writeln!(out, "| Rows | {} |", profile.total_rows)?;
        writeln!(out, "| Columns | {} |", profile.fields.len())?;
        writeln!(out, "| Quality | {:.2} |", profile.data_quality_score)?;
        if let Some(adjusted) = result.adjusted_quality_score {
            writeln!(out, "| Adjusted quality | {adjusted:.2} |")?;
        }
        writeln!(out, "| Size | {} bytes |", profile.file_size)?;

        if config.include_profile && !profile.fields.is_empty() {
            writeln!(out)?;
            writeln!(out, "| Field | Type | Nullable | Nulls | Sample |")?;
            writeln!(out, "|-------|------|----------|-------|--------|")?;
            for field in &profile.fields {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} |",
                    cell(&field.name),
                    field.field_type,
                    if field.nullable { "yes" } else { "no" },
                    field.null_count,
                    cell(field.sample_value.as_deref().unwrap_or(""))
                )?;
            }
        }
    }

    let recommendations = config.recommendations(&result.recommendations);
    if !recommendations.is_empty() {
        writeln!(out)?;
        writeln!(out, "{sub} Recommendations")?;
        writeln!(out)?;
        for r in recommendations {
            writeln!(out, "- {r}")?;
        }
    }

    if let Some(storage) = &result.storage_recommendation {
        writeln!(out)?;
        writeln!(out, "{sub} Storage")?;
        writeln!(out)?;
        writeln!(out, "**Primary:** {}", storage.primary_storage)?;
        writeln!(out)?;
        writeln!(out, "{}", storage.reasoning.rationale)?;
        writeln!(out)?;
        writeln!(out, "| System | Suitable | Reasons |")?;
        writeln!(out, "|--------|----------|---------|")?;
        for system in crate::core::StorageSystem::ALL {
            let option = storage.storage_options.get(system);
            writeln!(
                out,
                "| {system} | {} | {} |",
                if option.suitable { "yes" } else { "no" },
                cell(&option.reasons.join("; "))
            )?;
        }
    }

    if config.include_schema {
        if let Some(schema) = &result.table_schema {
            writeln!(out)?;
            writeln!(out, "{sub} Schema `{}`", schema.table_name)?;
            writeln!(out)?;
            writeln!(out, "| Column | Type | Nullable | Indexed |")?;
            writeln!(out, "|--------|------|----------|---------|")?;
            for field in &schema.fields {
                writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    cell(&field.name),
                    field.sql_type,
                    if field.nullable { "yes" } else { "no" },
                    if field.indexed { "yes" } else { "no" }
                )?;
            }
        }
    }

    if config.include_llm {
        if let Some(analysis) = &result.llm_analysis {
            writeln!(out)?;
            writeln!(out, "{sub} Model Analysis")?;
            writeln!(out)?;
            writeln!(out, "{}", analysis.trim())?;
        }
    }

    if config.include_ddl {
        if let Some(script) = &result.ddl_script {
            writeln!(out)?;
            writeln!(out, "{sub} DDL ({})", ddl_origin(result.ddl_source))?;
            writeln!(out)?;
            writeln!(out, "```sql")?;
            writeln!(out, "{}", script.trim_end())?;
            writeln!(out, "```")?;
        }
    }

    Ok(())
}
