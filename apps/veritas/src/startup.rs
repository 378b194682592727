//! # Startup
//!
//! Wiring from a `VeritasConfig` to a ready `Pipeline`: corpus load, embedder
//! choice, index build, collaborator clients.
//!
//! Corpus loading and index building are blocking work and run on
//! `spawn_blocking` threads.

use crate::collaborators::{DisabledSearch, GoogleSearch, OllamaClient, OllamaEmbedder, WebSearch};
use crate::config::{EmbedderKind, VeritasConfig};
use crate::error::AppError;
use crate::pipeline::{Classifier, Dispatcher, Pipeline, RunOptions};
use std::sync::Arc;
use std::time::Duration;
use veritas_core::{
    BuildReport, CacheStatus, Corpus, Embedder, HashingEmbedder, LoadReport, RetrievalEngine,
    RetrievalOptions, SourceStatus,
};

// =============================================================================
// CORPUS
// =============================================================================

/// Load the corpus from `corpus.data_dir`, logging the per-source outcome.
///
/// Fails only when no source yields a single article.
pub async fn load_corpus(config: &VeritasConfig) -> Result<Corpus, AppError> {
    let data_dir = config.corpus.data_dir.clone();
    tracing::info!(data_dir = %data_dir.display(), "Loading corpus");
    let (corpus, report) = tokio::task::spawn_blocking(move || Corpus::load(&data_dir)).await??;
    log_load_report(&report);
    Ok(corpus)
}

pub fn log_load_report(report: &LoadReport) {
    for source in &report.sources {
        match &source.status {
            SourceStatus::Loaded { articles, dropped } => tracing::info!(
                source = %source.source,
                articles,
                dropped,
                "Source loaded"
            ),
            SourceStatus::Missing => tracing::warn!(
                source = %source.source,
                path = %source.path.display(),
                "Source file missing, skipped"
            ),
            SourceStatus::Unreadable { reason } => tracing::warn!(
                source = %source.source,
                path = %source.path.display(),
                reason = %reason,
                "Source file unreadable, skipped"
            ),
        }
    }
    tracing::info!(
        articles = report.total_loaded(),
        dropped = report.total_dropped(),
        skipped = report.skipped().count(),
        "Corpus ready"
    );
}

// =============================================================================
// INDEX
// =============================================================================

/// The embedder selected by `index.embedder`.
///
/// Must be called inside a tokio runtime: the Ollama embedder keeps a handle
/// to it.
pub fn make_embedder(config: &VeritasConfig) -> Result<Arc<dyn Embedder>, AppError> {
    match config.index.embedder {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.index.hashing_dimensions))),
        EmbedderKind::Ollama => {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| AppError::Config(format!("Ollama embedder needs a runtime: {e}")))?;
            Ok(Arc::new(OllamaEmbedder::new(
                config.llm.base_url.clone(),
                config.index.embed_model.clone(),
                Duration::from_secs(config.llm.timeout_secs),
                runtime,
            )?))
        }
    }
}

#[must_use]
pub fn retrieval_options(config: &VeritasConfig) -> RetrievalOptions {
    RetrievalOptions {
        strategy: config.index.strategy,
        lexical_weight: config.retrieval.lexical_weight,
        cache_dir: config.index.cache_dir.clone(),
    }
}

/// Build both indices on a blocking thread.
pub async fn build_engine(
    config: &VeritasConfig,
    corpus: Corpus,
) -> Result<Arc<RetrievalEngine>, AppError> {
    let embedder = make_embedder(config)?;
    let options = retrieval_options(config);
    tracing::info!(
        articles = corpus.len(),
        strategy = %options.strategy,
        model = embedder.model_id(),
        "Building retrieval engine"
    );
    let engine =
        tokio::task::spawn_blocking(move || RetrievalEngine::build(corpus, embedder, options))
            .await??;
    log_build_report(engine.report());
    Ok(Arc::new(engine))
}

pub fn log_build_report(report: &BuildReport) {
    if let CacheStatus::Unavailable { reason } = &report.cache {
        tracing::warn!(reason = %reason, "Embedding cache unavailable, vectors computed in memory");
    }
    tracing::info!(
        articles = report.articles,
        vocabulary = report.vocabulary,
        vectors = report.vectors,
        dimension = report.dimension,
        strategy = %report.strategy,
        model = %report.model_id,
        cache_hit = report.cache.is_hit(),
        "Retrieval engine ready"
    );
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Google search when both credentials are set, otherwise a search that
/// always fails (external modes then yield empty evidence).
pub fn make_search(config: &VeritasConfig) -> Result<Arc<dyn WebSearch>, AppError> {
    match (&config.search.api_key, &config.search.cse_id) {
        (Some(key), Some(cx)) => Ok(Arc::new(GoogleSearch::new(
            key.clone(),
            cx.clone(),
            config.search.num_results,
            Duration::from_secs(config.search.timeout_secs),
            config.search.requests_per_second,
        )?)),
        _ => {
            if config.retrieval.mode.uses_web() {
                tracing::warn!(
                    mode = %config.retrieval.mode,
                    "GOOGLE_API_KEY / GOOGLE_CSE_ID not set, web search disabled"
                );
            } else {
                tracing::info!("Web search not configured");
            }
            Ok(Arc::new(DisabledSearch))
        }
    }
}

/// Production pipeline over `engine`: Ollama for questions and verdicts,
/// Google (or nothing) for the web.
pub fn build_pipeline(
    config: &VeritasConfig,
    engine: Arc<RetrievalEngine>,
) -> Result<Arc<Pipeline>, AppError> {
    let ollama = Arc::new(OllamaClient::new(
        config.llm.base_url.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?);
    let dispatcher = Dispatcher::new(engine, make_search(config)?, config.retrieval.k);
    Ok(Arc::new(Pipeline::new(
        ollama.clone(),
        dispatcher,
        Classifier::new(ollama),
    )))
}

/// Run options from the configured defaults.
#[must_use]
pub fn default_run_options(config: &VeritasConfig) -> RunOptions {
    RunOptions {
        mode: config.retrieval.mode,
        strategy: config.pipeline.strategy,
        method: config.retrieval.method,
        model: config.llm.model.clone(),
        timeout: config.pipeline.run_timeout(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use veritas_core::SourceKey;

    fn hashing_config(data_dir: &std::path::Path) -> VeritasConfig {
        let mut config = VeritasConfig::default();
        config.corpus.data_dir = data_dir.to_path_buf();
        config.index.embedder = EmbedderKind::Hashing;
        config.index.hashing_dimensions = 32;
        config.index.cache_dir = None;
        config
    }

    #[tokio::test]
    async fn empty_data_dir_fails_startup() {
        let temp = tempdir().expect("temp dir");
        let result = load_corpus(&hashing_config(temp.path())).await;
        assert!(matches!(
            result,
            Err(AppError::Core(veritas_core::VeritasError::EmptyCorpus))
        ));
    }

    #[tokio::test]
    async fn one_source_is_enough_to_build() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join(SourceKey::Lupa.relative_path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(
            file,
            r#"{{"url": "https://lupa.example/1", "titulo": "Vacinas", "texto": "Vacinas são seguras", "classificacao": "Verdadeiro"}}"#
        )
        .expect("write");

        let config = hashing_config(temp.path());
        let corpus = load_corpus(&config).await.expect("load");
        assert_eq!(corpus.len(), 1);

        let engine = build_engine(&config, corpus).await.expect("build");
        assert_eq!(engine.report().cache, CacheStatus::Disabled);
        assert_eq!(engine.report().model_id, "hashing-32");
    }

    #[test]
    fn options_follow_config() {
        let mut config = VeritasConfig::default();
        config.retrieval.lexical_weight = 0.8;
        let options = retrieval_options(&config);
        assert_eq!(options.lexical_weight, 0.8);
        let run = default_run_options(&config);
        assert_eq!(run.model, config.llm.model);
        assert_eq!(run.timeout, config.pipeline.run_timeout());
    }
}
