//! # Ollama Client
//!
//! Text generation (`POST /api/generate`) for questions and verdicts, and
//! embeddings (`POST /api/embed`) for the semantic index.

use super::{QuestionGenerator, VerdictModel, parse_questions};
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::runtime::Handle;
use veritas_core::{Embedder, VeritasError};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

fn build_http(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Http(format!("cannot build HTTP client: {e}")))
}

/// Prompt asking for 3 to 5 short verification questions as JSON.
#[must_use]
pub fn build_question_prompt(claim: &str) -> String {
    format!(
        "Você é um assistente de checagem de fatos.\n\
         A afirmação abaixo precisa ser verificada:\n\n\
         Claim: \"{claim}\"\n\n\
         Gere de 3 a 5 perguntas curtas e objetivas cujas respostas ajudariam a \
         confirmar ou refutar a afirmação.\n\n\
         Responda somente com JSON, sem explicações, exatamente neste formato:\n\
         {{\"questions\": [\"Pergunta 1\", \"Pergunta 2\", \"Pergunta 3\"]}}\n"
    )
}

// =============================================================================
// TEXT GENERATION
// =============================================================================

/// Async client for `/api/generate`.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Single non-streaming completion.
    pub async fn generate_text(&self, prompt: &str, model: &str) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.base_url);
        let body: GenerateResponse = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.response)
    }
}

#[async_trait]
impl QuestionGenerator for OllamaClient {
    async fn generate(&self, claim: &str, model: &str) -> Result<Vec<String>, AppError> {
        let raw = self.generate_text(&build_question_prompt(claim), model).await?;
        Ok(parse_questions(&raw))
    }
}

#[async_trait]
impl VerdictModel for OllamaClient {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AppError> {
        self.generate_text(prompt, model).await
    }
}

// =============================================================================
// EMBEDDINGS
// =============================================================================

/// Blocking `Embedder` over `/api/embed`.
///
/// Drives the async client on the captured runtime handle, so `embed` must
/// only be called from a blocking thread (`spawn_blocking`), never from an
/// async task.
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
    model_id: String,
    runtime: Handle,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self, AppError> {
        let model = model.into();
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_id: format!("ollama:{model}"),
            model,
            runtime,
        })
    }

    async fn embed_remote(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let url = format!("{}/api/embed", self.base_url);
        let body: EmbedResponse = self
            .http
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if body.embeddings.len() != texts.len() {
            return Err(AppError::Collaborator(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VeritasError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.runtime
            .block_on(self.embed_remote(texts))
            .map_err(|e| VeritasError::Embedding(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
