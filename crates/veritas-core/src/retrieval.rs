//! # Retrieval Engine
//!
//! Owns the corpus, both indices and the embedder. Built once, then
//! read-only: share it behind an `Arc` and call it from any thread.
//!
//! ## Methods
//!
//! - `lexical`: BM25 scores
//! - `semantic`: max-sim cosine scores
//! - `hybrid`: both score vectors min-max normalized, then
//!   `w * lexical + (1 - w) * semantic`
//!
//! Every ranking orders by descending score with ties broken by corpus
//! position, so identical inputs always give identical output.

use crate::embedding::Embedder;
use crate::evidence::{EvidenceOrigin, EvidenceResult};
use crate::lexical::LexicalIndex;
use crate::primitives::{DEFAULT_LEXICAL_WEIGHT, MAX_K, SNIPPET_LENGTH};
use crate::ranking::{min_max_normalize, top_k};
use crate::semantic::{CacheStatus, EncodingStrategy, SemanticIndex};
use crate::storage::EmbeddingCache;
use crate::text::prefix_chars;
use crate::verdict::LabelTone;
use crate::{Corpus, ScoredArticle, VeritasError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// RETRIEVAL METHOD
// =============================================================================

/// Scoring method for a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    #[default]
    Lexical,
    Semantic,
    Hybrid,
}

impl RetrievalMethod {
    pub const ALL: [RetrievalMethod; 3] = [Self::Lexical, Self::Semantic, Self::Hybrid];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RetrievalMethod {
    type Err = VeritasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.name() == s)
            .ok_or_else(|| VeritasError::InvalidArgument(format!("unknown retrieval method: {s}")))
    }
}

// =============================================================================
// BUILD OPTIONS & REPORT
// =============================================================================

/// Knobs fixed at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub strategy: EncodingStrategy,
    /// Weight of the lexical score in hybrid retrieval, in `[0, 1]`.
    pub lexical_weight: f32,
    /// Directory holding the embedding cache; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            strategy: EncodingStrategy::default(),
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            cache_dir: None,
        }
    }
}

/// What `build` did, for logs and the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub articles: usize,
    pub vocabulary: usize,
    pub vectors: usize,
    pub dimension: usize,
    pub strategy: EncodingStrategy,
    pub model_id: String,
    pub fingerprint: String,
    #[serde(flatten)]
    pub cache: CacheStatus,
}

// =============================================================================
// RETRIEVAL ENGINE
// =============================================================================

/// The immutable retrieval engine.
pub struct RetrievalEngine {
    corpus: Corpus,
    lexical: LexicalIndex,
    semantic: SemanticIndex,
    embedder: Arc<dyn Embedder>,
    lexical_weight: f32,
    report: BuildReport,
}

impl fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("articles", &self.corpus.len())
            .field("lexical_weight", &self.lexical_weight)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// Build both indices over `corpus`.
    ///
    /// An unusable cache directory is not fatal: the build proceeds uncached
    /// and the reason is recorded in the report.
    pub fn build(
        corpus: Corpus,
        embedder: Arc<dyn Embedder>,
        options: RetrievalOptions,
    ) -> Result<Self, VeritasError> {
        if !(0.0..=1.0).contains(&options.lexical_weight) {
            return Err(VeritasError::InvalidArgument(format!(
                "lexical weight {} outside [0, 1]",
                options.lexical_weight
            )));
        }

        let lexical = LexicalIndex::build(&corpus);

        let (cache, open_error) = match &options.cache_dir {
            Some(dir) => match EmbeddingCache::open_dir(dir) {
                Ok(cache) => (Some(cache), None),
                Err(e) => (None, Some(e.to_string())),
            },
            None => (None, None),
        };

        let (semantic, fingerprint, mut cache_status) =
            SemanticIndex::build(&corpus, embedder.as_ref(), options.strategy, cache.as_ref())?;
        if let Some(reason) = open_error {
            cache_status = CacheStatus::Unavailable { reason };
        }

        let report = BuildReport {
            articles: corpus.len(),
            vocabulary: lexical.vocabulary_size(),
            vectors: semantic.vector_count(),
            dimension: semantic.dimension(),
            strategy: options.strategy,
            model_id: embedder.model_id().to_string(),
            fingerprint,
            cache: cache_status,
        };

        Ok(Self {
            corpus,
            lexical,
            semantic,
            embedder,
            lexical_weight: options.lexical_weight,
            report,
        })
    }

    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[must_use]
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    #[must_use]
    pub fn lexical_weight(&self) -> f32 {
        self.lexical_weight
    }

    /// Dense score vector for `query` under `method`, indexed by `ArticleId`.
    pub fn scores(&self, query: &str, method: RetrievalMethod) -> Result<Vec<f32>, VeritasError> {
        match method {
            RetrievalMethod::Lexical => Ok(self.lexical.scores(query)),
            RetrievalMethod::Semantic => self.semantic.scores(query, self.embedder.as_ref()),
            RetrievalMethod::Hybrid => {
                let lexical = min_max_normalize(&self.lexical.scores(query));
                let semantic =
                    min_max_normalize(&self.semantic.scores(query, self.embedder.as_ref())?);
                let w = self.lexical_weight;
                Ok(lexical
                    .iter()
                    .zip(&semantic)
                    .map(|(l, s)| w * l + (1.0 - w) * s)
                    .collect())
            }
        }
    }

    /// Top-k scored articles for one query.
    pub fn rank(
        &self,
        query: &str,
        k: usize,
        method: RetrievalMethod,
    ) -> Result<Vec<ScoredArticle>, VeritasError> {
        Ok(top_k(&self.scores(query, method)?, k.min(MAX_K)))
    }

    /// Top-k evidence results for one query.
    pub fn retrieve(
        &self,
        query: &str,
        k: usize,
        method: RetrievalMethod,
    ) -> Result<Vec<EvidenceResult>, VeritasError> {
        Ok(self
            .rank(query, k, method)?
            .into_iter()
            .filter_map(|hit| self.to_evidence(hit))
            .collect())
    }

    /// Retrieve for several queries and merge without duplicate articles.
    ///
    /// A duplicate keeps its highest score (the first one on a tie). The merged
    /// list is ordered by descending score, ties by first appearance, and cut
    /// to `k_total`.
    pub fn retrieve_multi(
        &self,
        queries: &[String],
        k_per_query: usize,
        k_total: usize,
        method: RetrievalMethod,
    ) -> Result<Vec<EvidenceResult>, VeritasError> {
        let mut merged: Vec<EvidenceResult> = Vec::new();
        let mut position: BTreeMap<String, usize> = BTreeMap::new();

        for query in queries {
            for result in self.retrieve(query, k_per_query, method)? {
                let key = result
                    .identifier
                    .clone()
                    .unwrap_or_else(|| result.link.clone());
                match position.get(&key) {
                    Some(&i) => {
                        if result.score > merged[i].score {
                            merged[i] = result;
                        }
                    }
                    None => {
                        position.insert(key, merged.len());
                        merged.push(result);
                    }
                }
            }
        }

        merged.sort_by(|a, b| b.score.total_cmp(&a.score));
        merged.truncate(k_total.min(MAX_K));
        Ok(merged)
    }

    /// Map a scored article to an evidence result.
    #[must_use]
    pub fn to_evidence(&self, hit: ScoredArticle) -> Option<EvidenceResult> {
        let article = self.corpus.article_at(hit.article)?;
        let label = article.label();
        Some(EvidenceResult {
            title: article.title().to_string(),
            link: article.identifier().to_string(),
            snippet: prefix_chars(article.body(), SNIPPET_LENGTH).to_string(),
            score: hit.score,
            source: EvidenceOrigin::Corpus(article.source()),
            label: (!label.is_empty()).then(|| label.to_string()),
            identifier: Some(article.identifier().to_string()),
            tone: (!label.is_empty()).then(|| LabelTone::of(label)),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::{Article, SourceKey};

    fn engine(articles: Vec<Article>) -> RetrievalEngine {
        RetrievalEngine::build(
            Corpus::from_articles(articles),
            Arc::new(HashingEmbedder::new(128)),
            RetrievalOptions::default(),
        )
        .expect("build")
    }

    fn sample() -> RetrievalEngine {
        engine(vec![
            Article::new("https://a/vacina", SourceKey::Lupa, "Vacinas e autismo", "É falso que vacinas causam autismo")
                .with_label("Falso"),
            Article::new("https://a/tempo", SourceKey::G1, "Previsão do tempo", "Chuva forte em São Paulo")
                .with_label("Verdadeiro"),
            Article::new("https://a/eleicao", SourceKey::AosFatos, "Urnas", "Urnas eletrônicas são auditáveis"),
        ])
    }

    #[test]
    fn lexical_retrieval_maps_evidence() {
        let results = sample()
            .retrieve("vacinas causam autismo", 5, RetrievalMethod::Lexical)
            .expect("retrieve");
        assert_eq!(results.len(), 1);
        let top = &results[0];
        assert_eq!(top.link, "https://a/vacina");
        assert_eq!(top.label.as_deref(), Some("falso"));
        assert_eq!(top.source, EvidenceOrigin::Corpus(SourceKey::Lupa));
        assert_eq!(top.snippet, "É falso que vacinas causam autismo");
    }

    #[test]
    fn unlabeled_article_has_no_label() {
        let results = sample()
            .retrieve("urnas auditaveis", 5, RetrievalMethod::Lexical)
            .expect("retrieve");
        assert_eq!(results[0].label, None);
    }

    #[test]
    fn every_method_ranks_matching_article_first() {
        let engine = sample();
        for method in RetrievalMethod::ALL {
            let results = engine
                .retrieve("vacinas causam autismo", 3, method)
                .expect("retrieve");
            assert_eq!(results[0].link, "https://a/vacina", "method {method}");
        }
    }

    #[test]
    fn hybrid_scores_stay_in_unit_interval() {
        let scores = sample()
            .scores("vacinas chuva", RetrievalMethod::Hybrid)
            .expect("scores");
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn multi_query_deduplicates_by_identifier() {
        let results = sample()
            .retrieve_multi(
                &["vacinas autismo".to_string(), "vacinas causam".to_string()],
                3,
                5,
                RetrievalMethod::Lexical,
            )
            .expect("retrieve");
        let links: Vec<_> = results.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(links, vec!["https://a/vacina"]);
    }

    #[test]
    fn multi_query_truncates_to_total() {
        let results = sample()
            .retrieve_multi(
                &["vacinas".to_string(), "chuva".to_string(), "urnas".to_string()],
                3,
                2,
                RetrievalMethod::Lexical,
            )
            .expect("retrieve");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn weight_outside_unit_interval_rejected() {
        let result = RetrievalEngine::build(
            Corpus::default(),
            Arc::new(HashingEmbedder::default()),
            RetrievalOptions {
                lexical_weight: 1.5,
                ..RetrievalOptions::default()
            },
        );
        assert!(matches!(result, Err(VeritasError::InvalidArgument(_))));
    }

    #[test]
    fn report_describes_build() {
        let report = sample().report().clone();
        assert_eq!(report.articles, 3);
        assert_eq!(report.vectors, 3);
        assert_eq!(report.dimension, 128);
        assert_eq!(report.cache, CacheStatus::Disabled);
        assert_eq!(report.model_id, "hashing-128");
    }

    #[test]
    fn unusable_cache_dir_is_not_fatal() {
        let temp = tempfile::tempdir().expect("temp dir");
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"x").expect("write");

        let engine = RetrievalEngine::build(
            Corpus::from_articles(vec![Article::new("u", SourceKey::G1, "t", "b")]),
            Arc::new(HashingEmbedder::new(8)),
            RetrievalOptions {
                cache_dir: Some(file),
                ..RetrievalOptions::default()
            },
        )
        .expect("build");
        assert!(matches!(engine.report().cache, CacheStatus::Unavailable { .. }));
    }
}
