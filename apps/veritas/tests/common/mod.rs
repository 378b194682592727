//! Shared fixtures for the app integration tests: a small fact-check corpus
//! and scripted collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use veritas::AppError;
use veritas::collaborators::{QuestionGenerator, VerdictModel, WebHit, WebSearch};
use veritas::pipeline::{Classifier, Dispatcher, Pipeline, RetrievalMode, RunOptions};
use veritas_core::{
    Article, Corpus, HashingEmbedder, RetrievalEngine, RetrievalMethod, RetrievalOptions,
    SourceKey, VerdictStrategy,
};

// =============================================================================
// CORPUS
// =============================================================================

pub fn fact_check_engine() -> Arc<RetrievalEngine> {
    let corpus = Corpus::from_articles(vec![
        Article::new(
            "https://lupa.example/vacinas-autismo",
            SourceKey::Lupa,
            "É falso que vacinas causam autismo",
            "Estudos com milhões de crianças não encontraram relação entre vacinas e autismo.",
        )
        .with_label("Falso"),
        Article::new(
            "https://aosfatos.example/vacinas-estudo",
            SourceKey::AosFatos,
            "Estudo sobre vacinas e autismo foi retratado",
            "A revista retirou o artigo que associava vacinas ao autismo.",
        )
        .with_label("Enganoso"),
        Article::new(
            "https://g1.example/tempo",
            SourceKey::G1,
            "Previsão do tempo para o fim de semana",
            "Frente fria traz chuva e queda de temperatura no Sul.",
        )
        .with_label("Verdadeiro"),
    ]);
    Arc::new(
        RetrievalEngine::build(
            corpus,
            Arc::new(HashingEmbedder::new(64)),
            RetrievalOptions::default(),
        )
        .expect("build"),
    )
}

pub fn run_options(mode: RetrievalMode, strategy: VerdictStrategy) -> RunOptions {
    RunOptions {
        mode,
        strategy,
        method: RetrievalMethod::Lexical,
        model: "fake-model".to_string(),
        timeout: Duration::from_secs(10),
    }
}

// =============================================================================
// FAKE COLLABORATORS
// =============================================================================

/// Question generator with a fixed answer.
pub struct FakeQuestions {
    pub reply: Result<Vec<String>, String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeQuestions {
    pub fn answering(questions: &[&str]) -> Self {
        Self {
            reply: Ok(questions.iter().map(|q| (*q).to_string()).collect()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("model not found".to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl QuestionGenerator for FakeQuestions {
    async fn generate(&self, _claim: &str, _model: &str) -> Result<Vec<String>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(AppError::Http)
    }
}

/// Web search answering one hit per query, failing for chosen queries, with
/// optional per-query delays.
#[derive(Default)]
pub struct FakeSearch {
    pub failing: Vec<String>,
    pub delays: HashMap<String, Duration>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn failing_for(queries: &[&str]) -> Self {
        Self {
            failing: queries.iter().map(|q| (*q).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self {
            failing: vec!["*".to_string()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<WebHit>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|f| f == "*" || f == query) {
            return Err(AppError::Http("503 Service Unavailable".to_string()));
        }
        Ok(vec![WebHit {
            title: format!("Web result for {query}"),
            link: format!("https://web.example/?q={}", query.len()),
            snippet: "snippet".to_string(),
        }])
    }
}

/// Verdict model with a fixed reply.
pub struct FakeModel {
    pub reply: Result<String, String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeModel {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn refuting() -> Self {
        Self::answering(
            r#"{"classification": "Refuted", "confidence": 90, "justification": "Checagens desmentem."}"#,
        )
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("connection refused".to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerdictModel for FakeModel {
    async fn complete(&self, _prompt: &str, _model: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(AppError::Http)
    }
}

pub fn pipeline_with(
    questions: Arc<FakeQuestions>,
    search: Arc<FakeSearch>,
    model: Arc<FakeModel>,
) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(
        questions,
        Dispatcher::new(fact_check_engine(), search, 5),
        Classifier::new(model),
    ))
}
