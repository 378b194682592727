//! # API Request/Response Types
//!
//! JSON bodies for the HTTP API and their validation.

use crate::pipeline::{RetrievalMode, RunOptions};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use veritas_core::primitives::MAX_K;
use veritas_core::{BuildReport, EvidenceResult, RetrievalMethod, VerdictStrategy};

/// Longest accepted claim, in characters.
pub const MAX_CLAIM_LENGTH: usize = 2_000;
/// Most queries accepted by `/retrieve`.
pub const MAX_QUERIES: usize = 20;
/// Longest accepted query, in characters.
pub const MAX_QUERY_LENGTH: usize = 1_000;
/// Longest accepted model name.
pub const MAX_MODEL_NAME_LENGTH: usize = 128;

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the retrieval engine has finished building.
    pub ready: bool,
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(ready: bool) -> Self {
        Self {
            status: "ok".to_string(),
            ready,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Engine status: the build report plus the hybrid weight.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub build: BuildReport,
    pub cache_hit: bool,
    pub lexical_weight: f32,
}

/// Error body for every non-2xx answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// =============================================================================
// RETRIEVE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub queries: Vec<String>,
    #[serde(default)]
    pub k_per_query: Option<usize>,
    #[serde(default)]
    pub k_total: Option<usize>,
    #[serde(default)]
    pub method: Option<String>,
}

/// A validated `/retrieve` request.
#[derive(Debug, Clone)]
pub struct RetrieveParams {
    pub queries: Vec<String>,
    pub k_per_query: usize,
    pub k_total: usize,
    pub method: RetrievalMethod,
}

impl RetrieveRequest {
    /// Validate against limits, filling gaps from the defaults.
    pub fn validate(
        self,
        default_k_per_query: usize,
        default_k_total: usize,
        default_method: RetrievalMethod,
    ) -> Result<RetrieveParams, String> {
        let queries: Vec<String> = self
            .queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if queries.is_empty() {
            return Err("queries must contain at least one non-empty query".to_string());
        }
        if queries.len() > MAX_QUERIES {
            return Err(format!("at most {MAX_QUERIES} queries are accepted"));
        }
        if queries.iter().any(|q| q.chars().count() > MAX_QUERY_LENGTH) {
            return Err(format!("queries are limited to {MAX_QUERY_LENGTH} characters"));
        }
        let k_per_query = check_k("k_per_query", self.k_per_query.unwrap_or(default_k_per_query))?;
        let k_total = check_k("k_total", self.k_total.unwrap_or(default_k_total))?;

        Ok(RetrieveParams {
            queries,
            k_per_query,
            k_total,
            method: resolve_or_default(self.method.as_deref(), default_method, "method"),
        })
    }
}

fn check_k(name: &str, k: usize) -> Result<usize, String> {
    if k == 0 || k > MAX_K {
        return Err(format!("{name} must be within 1..={MAX_K}"));
    }
    Ok(k)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub method: RetrievalMethod,
    pub results: Vec<EvidenceResult>,
}

// =============================================================================
// ANALYZE
// =============================================================================

/// Body of `POST /analyze`, query string of `GET /analyze-stream`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub claim: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub retrieval_method: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl AnalyzeRequest {
    /// Validate the claim and resolve options.
    ///
    /// Unknown mode, strategy or method names fall back to the defaults.
    pub fn validate(self, defaults: &RunOptions) -> Result<(String, RunOptions), String> {
        let claim = self.claim.trim().to_string();
        if claim.is_empty() {
            return Err("claim must not be empty".to_string());
        }
        if claim.chars().count() > MAX_CLAIM_LENGTH {
            return Err(format!("claim is limited to {MAX_CLAIM_LENGTH} characters"));
        }

        let model = match self.model.map(|m| m.trim().to_string()) {
            Some(m) if m.len() > MAX_MODEL_NAME_LENGTH => {
                return Err(format!("model name is limited to {MAX_MODEL_NAME_LENGTH} bytes"));
            }
            Some(m) if !m.is_empty() => m,
            _ => defaults.model.clone(),
        };

        let options = RunOptions {
            mode: resolve_or_default::<RetrievalMode>(self.mode.as_deref(), defaults.mode, "mode"),
            strategy: resolve_or_default::<VerdictStrategy>(
                self.strategy.as_deref(),
                defaults.strategy,
                "strategy",
            ),
            method: resolve_or_default::<RetrievalMethod>(
                self.retrieval_method.as_deref(),
                defaults.method,
                "retrieval_method",
            ),
            model,
            timeout: defaults.timeout,
        };
        Ok((claim, options))
    }
}

fn resolve_or_default<T>(raw: Option<&str>, default: T, field: &str) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|e| {
            tracing::warn!(field, value, "Invalid option, using default: {}", e);
            default
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
