//! # Veritas HTTP API Module
//!
//! HTTP front end for the claim pipeline, using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness, readiness flag and version
//! - `GET /status` - Engine build report
//! - `POST /retrieve` - Deduplicated multi-query retrieval
//! - `POST /analyze` - Run a claim and return the report
//! - `GET /analyze-stream` - Run a claim with Server-Sent Events progress
//!
//! ## Security Configuration
//!
//! - `server.cors_origins` / `VERITAS_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `server.rate_limit` / `VERITAS_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `server.api_key` / `VERITAS_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, keys_match};
pub use handlers::{
    analyze_handler, analyze_stream_handler, health_handler, retrieve_handler, status_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    AnalyzeRequest, ErrorResponse, HealthResponse, MAX_CLAIM_LENGTH, MAX_QUERIES,
    MAX_QUERY_LENGTH, RetrieveParams, RetrieveRequest, RetrieveResponse, StatusResponse,
};

use crate::config::{ServerConfig, VeritasConfig};
use crate::error::AppError;
use crate::pipeline::{Pipeline, RunOptions};
use crate::startup;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::{Arc, OnceLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Per-request defaults taken from the configuration.
#[derive(Debug, Clone)]
pub struct ApiDefaults {
    pub run: RunOptions,
    pub k_per_query: usize,
    pub k_total: usize,
}

impl ApiDefaults {
    #[must_use]
    pub fn from_config(config: &VeritasConfig) -> Self {
        Self {
            run: startup::default_run_options(config),
            k_per_query: config.retrieval.k_per_query,
            k_total: config.retrieval.k_total,
        }
    }
}

/// Shared server state.
///
/// The pipeline is published once, when the background index build
/// finishes; until then the claim endpoints answer 503.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<OnceLock<Arc<Pipeline>>>,
    defaults: Arc<ApiDefaults>,
}

impl AppState {
    /// State with no pipeline yet.
    #[must_use]
    pub fn new(defaults: ApiDefaults) -> Self {
        Self {
            pipeline: Arc::new(OnceLock::new()),
            defaults: Arc::new(defaults),
        }
    }

    /// State that is ready from the start.
    #[must_use]
    pub fn with_pipeline(pipeline: Arc<Pipeline>, defaults: ApiDefaults) -> Self {
        let state = Self::new(defaults);
        state.publish(pipeline);
        state
    }

    /// Make the pipeline available. Only the first call has an effect.
    pub fn publish(&self, pipeline: Arc<Pipeline>) -> bool {
        self.pipeline.set(pipeline).is_ok()
    }

    /// The published pipeline, or `NotReady` while the index builds.
    pub fn pipeline(&self) -> Result<Arc<Pipeline>, AppError> {
        self.pipeline.get().cloned().ok_or(AppError::NotReady)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.pipeline.get().is_some()
    }

    #[must_use]
    pub fn defaults(&self) -> &ApiDefaults {
        &self.defaults
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `server.cors_origins`.
///
/// - `"*"`: any origin
/// - unset: localhost only
/// - otherwise: the comma-separated origins that parse
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8000",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8000",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body size limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if a key is configured)
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = build_cors_layer(server.cors_origins.as_deref());

    let rate_limiter = if server.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
        Some(create_rate_limiter(server.rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let api_key = server
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| ApiKey(Arc::from(k)));
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set VERITAS_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/retrieve", post(handlers::retrieve_handler))
        .route("/analyze", post(handlers::analyze_handler))
        .route("/analyze-stream", get(handlers::analyze_stream_handler));

    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(server.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
///
/// The corpus is loaded before binding, so a missing corpus fails startup.
/// The index is built in the background while the server already answers
/// `/health`.
pub async fn run_server(addr: &str, config: VeritasConfig) -> Result<(), AppError> {
    let corpus = startup::load_corpus(&config).await?;

    let state = AppState::new(ApiDefaults::from_config(&config));
    let router = create_router(state.clone(), &config.server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("Bind failed: {}", e)))?;
    tracing::info!("Veritas HTTP server listening on {}", addr);

    tokio::spawn(async move {
        let built = match startup::build_engine(&config, corpus).await {
            Ok(engine) => startup::build_pipeline(&config, engine),
            Err(e) => Err(e),
        };
        match built {
            Ok(pipeline) => {
                state.publish(pipeline);
                tracing::info!("Engine ready, claim endpoints enabled");
            }
            Err(e) => {
                tracing::error!(error = %e, "Engine build failed, claim endpoints stay unavailable");
            }
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
