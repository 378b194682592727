//! # API Endpoint Handlers
//!
//! Claim and retrieval endpoints answer `503` until the engine is ready.

use super::{
    AppState,
    types::{
        AnalyzeRequest, ErrorResponse, HealthResponse, RetrieveRequest, RetrieveResponse,
        StatusResponse,
    },
};
use crate::error::AppError;
use crate::pipeline::{Pipeline, RunEvent};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use veritas_core::VeritasError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

/// Status code for an app error surfacing through the API.
fn status_of(e: &AppError) -> StatusCode {
    match e {
        AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Core(VeritasError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
        AppError::Core(_) | AppError::Collaborator(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
        AppError::Config(_) | AppError::Task(_) | AppError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn app_error(e: AppError) -> ApiError {
    error(status_of(&e), e.to_string())
}

fn ready_pipeline(state: &AppState) -> Result<Arc<Pipeline>, ApiError> {
    state.pipeline().map_err(app_error)
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Liveness plus readiness; never auth-gated.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::new(state.is_ready()))
}

/// Build report of the running engine.
pub async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let pipeline = ready_pipeline(&state)?;
    let engine = pipeline.dispatcher().engine();
    let build = engine.report().clone();
    Ok(Json(StatusResponse {
        cache_hit: build.cache.is_hit(),
        build,
        lexical_weight: engine.lexical_weight(),
    }))
}

// =============================================================================
// RETRIEVE
// =============================================================================

/// Deduplicated multi-query retrieval over the local corpus.
pub async fn retrieve_handler(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let pipeline = ready_pipeline(&state)?;
    let defaults = state.defaults();
    let params = request
        .validate(defaults.k_per_query, defaults.k_total, defaults.run.method)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;

    let engine = Arc::clone(pipeline.dispatcher().engine());
    let method = params.method;
    let results = tokio::task::spawn_blocking(move || {
        engine.retrieve_multi(&params.queries, params.k_per_query, params.k_total, method)
    })
    .await
    .map_err(|e| app_error(e.into()))?
    .map_err(|e| {
        tracing::warn!(error = %e, "Retrieval failed");
        app_error(e.into())
    })?;

    Ok(Json(RetrieveResponse { method, results }))
}

// =============================================================================
// ANALYZE
// =============================================================================

/// Run a claim to completion and return the report.
pub async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = ready_pipeline(&state)?;
    let (claim, options) = request
        .validate(&state.defaults().run)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;

    match pipeline.run_to_completion(claim, options).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            tracing::error!(error = %e, "Claim analysis failed");
            Err(app_error(e))
        }
    }
}

/// Server-Sent Events: one `data:` line per stage, then `event: result`
/// with the report as JSON, or `event: error`.
pub async fn analyze_stream_handler(
    State(state): State<AppState>,
    Query(request): Query<AnalyzeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let pipeline = ready_pipeline(&state)?;
    let (claim, options) = request
        .validate(&state.defaults().run)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;

    let events = pipeline.run_claim(claim, options).map(|event| Ok(to_sse(event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse(event: RunEvent) -> Event {
    match event {
        RunEvent::Stage { message } => Event::default().data(message),
        RunEvent::Completed(report) => match Event::default().event("result").json_data(&report) {
            Ok(event) => event,
            Err(e) => Event::default()
                .event("error")
                .data(format!("Cannot encode result: {e}")),
        },
        RunEvent::Failed { reason } => Event::default().event("error").data(reason),
    }
}
