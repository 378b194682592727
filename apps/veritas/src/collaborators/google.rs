//! # Google Custom Search
//!
//! `GET https://www.googleapis.com/customsearch/v1?q=..&key=..&cx=..&num=..`
//!
//! Calls are paced by a process-wide governor limiter and bounded by a
//! per-call timeout. There are no retries: the dispatcher treats a failed
//! call as an empty result list.

use super::{WebHit, WebSearch};
use crate::error::AppError;
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// Custom Search JSON API endpoint.
pub const CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The API refuses `num` above 10.
const MAX_NUM: usize = 10;

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

// =============================================================================
// GOOGLE SEARCH
// =============================================================================

pub struct GoogleSearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
    num_results: usize,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl GoogleSearch {
    pub fn new(
        api_key: impl Into<String>,
        cse_id: impl Into<String>,
        num_results: usize,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Http(format!("cannot build HTTP client: {e}")))?;
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            http,
            endpoint: CSE_ENDPOINT.to_string(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            num_results: num_results.clamp(1, MAX_NUM),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    /// Point at another endpoint (local mock servers).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str) -> Result<Vec<WebHit>, AppError> {
        self.limiter.until_ready().await;
        let num = self.num_results.to_string();
        let body: CseResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body
            .items
            .into_iter()
            .take(self.num_results)
            .map(|item| WebHit {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect())
    }
}

// =============================================================================
// DISABLED SEARCH
// =============================================================================

/// Stand-in used when no Google credentials are configured.
///
/// Every call fails, which the dispatcher turns into empty results.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _query: &str) -> Result<Vec<WebHit>, AppError> {
        Err(AppError::Config(
            "web search needs GOOGLE_API_KEY and GOOGLE_CSE_ID".to_string(),
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================
