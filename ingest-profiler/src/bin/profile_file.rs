//! Profile a single file and print the analysis report.
//!
//! Adapters are wired from flags first and `PROFILER_*` environment
//! variables second; anything left unset is skipped. A local store root
//! takes precedence over `PROFILER_S3_ENDPOINT`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use ingest_profiler::config::{PipelineConfig, ServiceSettings};
use ingest_profiler::core::{AnalysisStatus, DataFormat};
use ingest_profiler::formatters::{
    HumanFormatter, JsonFormatter, MarkdownFormatter, ReportConfig, ResultFormatter,
};
use ingest_profiler::llm::{HttpLlmClient, LlmClientConfig};
use ingest_profiler::logging::setup::{init_logging, LoggingConfig};
use ingest_profiler::logging::LogConfig;
use ingest_profiler::pipeline::{AnalysisRequest, AnalysisRunner};
use ingest_profiler::repository::InMemoryRepository;
use ingest_profiler::store::ObjectStorage;
use ingest_profiler::workflow::{AirflowClient, AirflowConfig};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Markdown,
    Human,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to profile
    path: PathBuf,

    /// Format to assume when the extension is not recognised
    #[arg(long)]
    format: Option<DataFormat>,

    /// Owner recorded on the analysis
    #[arg(long, default_value = "local")]
    user: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = Output::Human)]
    output: Output,

    /// LLM service endpoint; enables enrichment and generated DDL
    /// [default: PROFILER_LLM_ENDPOINT]
    #[arg(long)]
    llm_endpoint: Option<String>,

    /// Directory used as local object store [default: PROFILER_STORE_ROOT]
    #[arg(long)]
    store_root: Option<String>,

    /// Name of the derived table
    #[arg(long, default_value = "analyzed_data")]
    table: String,

    /// Trigger the downstream DAG after a completed analysis
    #[arg(long)]
    trigger_workflow: bool,

    /// Disable ANSI colours in human output
    #[arg(long)]
    no_color: bool,

    /// Debug logging including LLM response excerpts
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut settings = ServiceSettings::from_env()?;
    if args.store_root.is_some() {
        settings.store_root = args.store_root.clone();
    }

    let base_level = settings.tracing_level()?;
    let log_config = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig {
            base_level,
            ..LogConfig::default()
        }
    };
    init_logging(
        LoggingConfig::default()
            .with_level(Level::WARN)
            .with_profiler_level(log_config.base_level)
            .with_json_format(settings.log_json),
    )?;

    let config = PipelineConfig::default()
        .with_table_name(&args.table)
        .with_workflow_trigger(args.trigger_workflow)
        .with_log_config(log_config);
    let repository = Arc::new(InMemoryRepository::new());
    let mut runner = AnalysisRunner::new(config)
        .with_analysis_repository(repository.clone())
        .with_file_repository(repository);

    if let Some(root) = settings.store_root.as_deref().filter(|r| !r.trim().is_empty()) {
        std::fs::create_dir_all(root)?;
    }
    if let Some(storage) = settings.object_storage() {
        info!(backend = storage.backend_name(), "Mirroring uploads");
        runner = runner.with_storage(Arc::new(storage));
    }

    if let Some(endpoint) = args.llm_endpoint.as_ref().or(settings.llm_endpoint.as_ref()) {
        let mut llm = LlmClientConfig::new(endpoint);
        if let Some(key) = settings.llm_api_key.clone() {
            llm = llm.with_api_key(key);
        }
        if let Some(model) = &settings.llm_model {
            llm = llm.with_model(model);
        }
        runner = runner.with_llm(Arc::new(HttpLlmClient::new(llm)?));
    }

    if args.trigger_workflow {
        if let (Some(url), Some(user), Some(password)) = (
            &settings.airflow_url,
            &settings.airflow_user,
            settings.airflow_password.clone(),
        ) {
            let client = AirflowClient::new(AirflowConfig::new(url, user, password))?;
            runner = runner.with_workflow(Arc::new(client));
        }
    }

    let mut request = AnalysisRequest::from_path(&args.user, &args.path);
    if let Some(format) = args.format {
        request = request.with_declared_format(format);
    }

    info!(path = %args.path.display(), "Profiling file");
    let result = runner.run(request).await;

    let report = ReportConfig::default().with_colors(!args.no_color);
    let rendered = match args.output {
        Output::Json => JsonFormatter::with_config(report).format(&result)?,
        Output::Markdown => MarkdownFormatter::with_config(report.with_colors(false)).format(&result)?,
        Output::Human => HumanFormatter::with_config(report).format(&result)?,
    };
    println!("{rendered}");

    if result.status == AnalysisStatus::Failed {
        process::exit(1);
    }
    Ok(())
}
