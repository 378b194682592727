//! Integration tests for the Veritas HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

mod common;

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use common::{FakeModel, FakeQuestions, FakeSearch, pipeline_with, run_options};
use serde_json::{Value, json};
use std::sync::Arc;
use veritas::api::{ApiDefaults, AppState, HealthResponse, RetrieveResponse, create_router};
use veritas::AppError;
use veritas::config::ServerConfig;
use veritas::pipeline::RetrievalMode;
use veritas_core::VerdictStrategy;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn defaults() -> ApiDefaults {
    ApiDefaults {
        run: run_options(RetrievalMode::Local, VerdictStrategy::Model),
        k_per_query: 3,
        k_total: 5,
    }
}

fn ready_state() -> AppState {
    let pipeline = pipeline_with(
        Arc::new(FakeQuestions::answering(&["vacinas autismo", "vacinas estudo"])),
        Arc::new(FakeSearch::default()),
        Arc::new(FakeModel::refuting()),
    );
    AppState::with_pipeline(pipeline, defaults())
}

fn server_with(state: AppState, config: &ServerConfig) -> TestServer {
    TestServer::new(create_router(state, config)).expect("test server")
}

/// Server over a ready pipeline with default middleware settings.
fn create_test_server() -> TestServer {
    server_with(ready_state(), &ServerConfig::default())
}

// =============================================================================
// HEALTH / READINESS
// =============================================================================

#[tokio::test]
async fn test_health_reports_ready() {
    let server = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(health.ready);
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_endpoints_unavailable_while_building() {
    let server = server_with(AppState::new(defaults()), &ServerConfig::default());

    let health: HealthResponse = server.get("/health").await.json();
    assert!(!health.ready);

    let status = server.get("/status").await;
    status.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = status.json();
    assert_eq!(body["error"], "Retrieval engine is still building, retry shortly");
    server
        .post("/retrieve")
        .json(&json!({"queries": ["vacinas"]}))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .post("/analyze")
        .json(&json!({"claim": "Vacinas causam autismo"}))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_publish_flips_readiness() {
    let state = AppState::new(defaults());
    let server = server_with(state.clone(), &ServerConfig::default());
    server.get("/status").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    assert!(matches!(state.pipeline(), Err(AppError::NotReady)));
    let pipeline = ready_state().pipeline().expect("pipeline");
    assert!(state.publish(pipeline.clone()));
    assert!(!state.publish(pipeline));

    server.get("/status").await.assert_status_ok();
}

// =============================================================================
// STATUS / RETRIEVE
// =============================================================================

#[tokio::test]
async fn test_status_reports_build() {
    let server = create_test_server();

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["articles"], 3);
    assert_eq!(status["strategy"], "chunk_pool");
    assert_eq!(status["cache"], "disabled");
    assert_eq!(status["cache_hit"], false);
}

#[tokio::test]
async fn test_retrieve_deduplicates_across_queries() {
    let server = create_test_server();

    let response = server
        .post("/retrieve")
        .json(&json!({
            "queries": ["vacinas autismo", "autismo vacinas", "vacinas"],
            "k_per_query": 3,
            "k_total": 10,
            "method": "hybrid"
        }))
        .await;
    response.assert_status_ok();

    let body: RetrieveResponse = response.json();
    assert!(!body.results.is_empty());
    let mut links: Vec<&str> = body.results.iter().map(|r| r.link.as_str()).collect();
    let total = links.len();
    links.sort_unstable();
    links.dedup();
    assert_eq!(links.len(), total);
    assert!(body.results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_retrieve_rejects_empty_queries() {
    let server = create_test_server();

    let response = server
        .post("/retrieve")
        .json(&json!({"queries": ["   "]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().is_some());
}

// =============================================================================
// ANALYZE
// =============================================================================

#[tokio::test]
async fn test_analyze_returns_report() {
    let server = create_test_server();

    let response = server
        .post("/analyze")
        .json(&json!({"claim": "Vacinas causam autismo"}))
        .await;
    response.assert_status_ok();

    let report: Value = response.json();
    assert_eq!(report["claim"], "Vacinas causam autismo");
    assert_eq!(report["verdict"]["classification"], "Refuted");
    assert_eq!(report["mode"], "local");
    assert_eq!(report["questions"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_analyze_invalid_options_fall_back_to_defaults() {
    let server = create_test_server();

    let report: Value = server
        .post("/analyze")
        .json(&json!({
            "claim": "Vacinas causam autismo",
            "mode": "carrier-pigeon",
            "strategy": "label_majority",
            "retrieval_method": "psychic"
        }))
        .await
        .json();

    assert_eq!(report["mode"], "local");
    assert_eq!(report["retrieval_method"], "lexical");
    assert_eq!(report["strategy"], "label_majority");
    assert_eq!(report["verdict"]["strategy"], "label_majority");
}

#[tokio::test]
async fn test_analyze_rejects_empty_claim() {
    let server = create_test_server();

    server
        .post("/analyze")
        .json(&json!({"claim": ""}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_failed_run_is_bad_gateway() {
    let pipeline = pipeline_with(
        Arc::new(FakeQuestions::failing()),
        Arc::new(FakeSearch::always_failing()),
        Arc::new(FakeModel::failing()),
    );
    let server = server_with(
        AppState::with_pipeline(pipeline, defaults()),
        &ServerConfig::default(),
    );

    server
        .post("/analyze")
        .json(&json!({"claim": "Vacinas causam autismo", "mode": "external"}))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_analyze_stream_sends_stages_then_result() {
    let server = create_test_server();

    let response = server
        .get("/analyze-stream")
        .add_query_param("claim", "Vacinas causam autismo")
        .add_query_param("strategy", "label_majority")
        .await;
    response.assert_status_ok();

    let text = response.text();
    assert!(text.contains("data: Starting analysis"));
    assert!(text.contains("event: result"));
    assert!(!text.contains("event: error"));
    let stage = text.find("data: Starting analysis").expect("stage");
    let result = text.find("event: result").expect("result");
    assert!(stage < result);
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

#[tokio::test]
async fn test_api_key_required_except_health() {
    let config = ServerConfig {
        api_key: Some("s3cret".to_string()),
        ..ServerConfig::default()
    };
    let server = server_with(ready_state(), &config);

    server.get("/health").await.assert_status_ok();
    server.get("/status").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/status")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/status")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_answers_429() {
    let config = ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    };
    let server = server_with(ready_state(), &config);

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.header(header::RETRY_AFTER),
        HeaderValue::from_static("1")
    );
}
