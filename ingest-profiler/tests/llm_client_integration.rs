//! Integration tests for the HTTP LLM client against a mock server.

#![cfg(feature = "llm")]

use std::sync::Arc;
use std::time::Duration;

use ingest_profiler::config::PipelineConfig;
use ingest_profiler::core::{AnalysisStatus, DdlSource};
use ingest_profiler::llm::{prompts, HttpLlmClient, LlmBackend, LlmClientConfig, LlmError};
use ingest_profiler::pipeline::{AnalysisRequest, AnalysisRunner};
use ingest_profiler::sources::{CsvParser, FormatParser};
use mockito::{Matcher, Server};
use serde_json::json;

fn client(url: String) -> HttpLlmClient {
    HttpLlmClient::new(
        LlmClientConfig::new(format!("{url}/api/v1/process"))
            .with_api_key("test-key")
            .with_model("llama3.2")
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn analysis_request() -> ingest_profiler::llm::LlmRequest {
    let profile = CsvParser::new().parse(b"name;age\nJohn;30\nJane;25").unwrap();
    prompts::analysis_request(&profile, &[], "people.csv")
}

#[tokio::test]
async fn test_request_shape_and_auth() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/process")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "operation_type": "data_analysis",
            "model": "llama3.2",
            "source_config": {"type": "csv", "file_name": "people.csv"},
            "target_config": {"type": "analysis"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": "Looks clean.", "status": "success"}"#)
        .create_async()
        .await;

    let response = client(server.url()).complete(&analysis_request()).await.unwrap();
    assert_eq!(response.into_content().unwrap(), "Looks clean.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_message_alias_accepted() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/process")
        .with_status(200)
        .with_body(r#"{"message": "From message", "status": "ok"}"#)
        .create_async()
        .await;

    let response = client(server.url()).complete(&analysis_request()).await.unwrap();
    assert_eq!(response.into_content().unwrap(), "From message");
}

#[tokio::test]
async fn test_error_field_on_http_200_is_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/process")
        .with_status(200)
        .with_body(r#"{"content": "", "status": "error", "error": {"message": "model offline", "code": "E42"}}"#)
        .create_async()
        .await;

    let response = client(server.url()).complete(&analysis_request()).await.unwrap();
    let err = response.into_content().unwrap_err();
    assert!(matches!(err, LlmError::Service { .. }));
    assert!(err.to_string().contains("model offline"));
}

#[tokio::test]
async fn test_status_mapping() {
    let mut server = Server::new_async().await;
    let llm = client(server.url());

    let cases: [(usize, fn(&LlmError) -> bool); 4] = [
        (401, |e| matches!(e, LlmError::Authentication { .. })),
        (400, |e| matches!(e, LlmError::InvalidRequest { .. })),
        (503, |e| matches!(e, LlmError::ServerError { status: 503, .. })),
        (404, |e| matches!(e, LlmError::ServerError { status: 404, .. })),
    ];
    for (status, check) in cases {
        let mock = server
            .mock("POST", "/api/v1/process")
            .with_status(status)
            .with_body("nope")
            .create_async()
            .await;
        let err = llm.complete(&analysis_request()).await.unwrap_err();
        assert!(check(&err), "status {status} mapped to {err:?}");
        mock.remove_async().await;
    }
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/process")
        .with_status(429)
        .with_header("Retry-After", "7")
        .create_async()
        .await;

    let err = client(server.url())
        .complete(&analysis_request())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(7));
}

#[tokio::test]
async fn test_runner_retries_server_errors_then_completes() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/api/v1/process")
        .with_status(502)
        .expect(4)
        .create_async()
        .await;

    let runner = AnalysisRunner::new(
        PipelineConfig::default()
            .with_llm_max_retries(1)
            .with_retry_base_delay(Duration::ZERO),
    )
    .with_llm(Arc::new(client(server.url())));
    let result = runner
        .run(AnalysisRequest::from_bytes("user_1", "people.csv", "name;age\nJohn;30"))
        .await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(result.llm_analysis.is_none());
    assert_eq!(result.ddl_source, Some(DdlSource::Fallback));
    failing.assert_async().await;
}

#[tokio::test]
async fn test_runner_uses_generated_ddl() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/process")
        .match_body(Matcher::PartialJson(json!({"operation_type": "data_analysis"})))
        .with_status(200)
        .with_body(r#"{"content": "Recommendation: add a surrogate key column", "status": "success"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/process")
        .match_body(Matcher::PartialJson(json!({
            "operation_type": "ddl_generation",
            "target_config": {"type": "postgresql", "table_name": "analyzed_data"}
        })))
        .with_status(200)
        .with_body(json!({"content": "```sql\nCREATE TABLE analyzed_data (name TEXT);\n```", "status": "success"}).to_string())
        .create_async()
        .await;

    let runner = AnalysisRunner::new(PipelineConfig::default()).with_llm(Arc::new(client(server.url())));
    let result = runner
        .run(AnalysisRequest::from_bytes("user_1", "people.csv", "name;age\nJohn;30"))
        .await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert_eq!(
        result.llm_recommendations,
        vec!["LLM: add a surrogate key column".to_string()]
    );
    assert_eq!(result.ddl_source, Some(DdlSource::Llm));
    assert_eq!(
        result.ddl_script.as_deref(),
        Some("CREATE TABLE analyzed_data (name TEXT);")
    );
}
