//! # Semantic Index
//!
//! Dense vector index over the corpus with per-article max-sim pooling.
//!
//! ## Layout
//!
//! Every article owns a contiguous range of vectors. `chunk_pool` produces one
//! vector per 500-character chunk; the other strategies produce exactly one.
//! Queries score against every vector and pool per article with `max`.
//!
//! ## Caching
//!
//! Vectors are addressed by a BLAKE3 fingerprint of the model id, the
//! strategy and, per article in corpus order, the identifier plus every text
//! the strategy hands to the embedder. A fingerprint hit skips the embedder
//! entirely.

use crate::embedding::{Embedder, dot, l2_normalize};
use crate::formats::CachedEmbeddings;
use crate::primitives::{CHUNK_SIZE, EMBED_BATCH_SIZE, TITLE_LABEL_SEPARATOR, TRUNCATE_LENGTH};
use crate::ranking::top_k;
use crate::storage::EmbeddingCache;
use crate::text::prefix_chars;
use crate::{Article, Corpus, ScoredArticle, VeritasError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ENCODING STRATEGY
// =============================================================================

/// How an article is turned into text for the embedder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingStrategy {
    /// Fixed-size chunks of `full_text`, max-sim pooled.
    #[default]
    ChunkPool,
    /// Title, subtitle and label joined together.
    TitleLabel,
    /// The first characters of `full_text`.
    Truncate,
}

impl EncodingStrategy {
    pub const ALL: [EncodingStrategy; 3] = [Self::ChunkPool, Self::TitleLabel, Self::Truncate];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChunkPool => "chunk_pool",
            Self::TitleLabel => "title_label",
            Self::Truncate => "truncate",
        }
    }

    /// Texts to embed for one article, in order.
    #[must_use]
    pub fn encode(self, article: &Article) -> Vec<String> {
        match self {
            Self::ChunkPool => chunk_text(article.full_text(), CHUNK_SIZE),
            Self::TitleLabel => {
                let parts: Vec<&str> = [article.title(), article.subtitle(), article.label()]
                    .into_iter()
                    .filter(|p| !p.is_empty())
                    .collect();
                vec![parts.join(TITLE_LABEL_SEPARATOR)]
            }
            Self::Truncate => vec![prefix_chars(article.full_text(), TRUNCATE_LENGTH).to_string()],
        }
    }
}

impl fmt::Display for EncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncodingStrategy {
    type Err = VeritasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| VeritasError::InvalidArgument(format!("unknown encoding strategy: {s}")))
    }
}

/// Split `text` into sequential, non-overlapping chunks of `size` characters.
///
/// The last chunk may be shorter. An empty text yields one empty chunk.
#[must_use]
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Content fingerprint that addresses cached vectors.
#[must_use]
pub fn fingerprint(model_id: &str, strategy: EncodingStrategy, corpus: &Corpus) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(strategy.name().as_bytes());
    hasher.update(&[0]);
    for (_, article) in corpus.iter() {
        hash_field(&mut hasher, article.identifier());
        let texts = strategy.encode(article);
        hasher.update(&(texts.len() as u64).to_le_bytes());
        for text in &texts {
            hash_field(&mut hasher, text);
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Feed `field` preceded by its byte length.
fn hash_field(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

// =============================================================================
// CACHE STATUS
// =============================================================================

/// What happened with the embedding cache during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cache", rename_all = "snake_case")]
pub enum CacheStatus {
    /// No cache configured.
    Disabled,
    /// Vectors were loaded from the cache.
    Hit,
    /// Vectors were computed and written to the cache.
    Miss,
    /// The cache could not be read or written; vectors were computed.
    Unavailable { reason: String },
}

impl CacheStatus {
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

// =============================================================================
// SEMANTIC INDEX
// =============================================================================

/// Vectors for every article plus the per-article ranges into them.
#[derive(Debug, Clone)]
pub struct SemanticIndex {
    strategy: EncodingStrategy,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    ranges: Vec<(u32, u32)>,
}

impl SemanticIndex {
    /// Build the index, reusing cached vectors when the fingerprint matches.
    ///
    /// Cache failures never fail the build; they surface in the returned
    /// `CacheStatus`.
    pub fn build(
        corpus: &Corpus,
        embedder: &dyn Embedder,
        strategy: EncodingStrategy,
        cache: Option<&EmbeddingCache>,
    ) -> Result<(Self, String, CacheStatus), VeritasError> {
        let key = fingerprint(embedder.model_id(), strategy, corpus);

        let Some(cache) = cache else {
            let index = Self::encode_corpus(corpus, embedder, strategy)?;
            return Ok((index, key, CacheStatus::Disabled));
        };

        match cache.load(&key) {
            Ok(Some(cached)) if cached.ranges.len() == corpus.len() => {
                let index = Self {
                    strategy,
                    dimension: cached.dimension as usize,
                    vectors: cached.vectors,
                    ranges: cached.ranges,
                };
                Ok((index, key, CacheStatus::Hit))
            }
            Ok(_) => {
                let index = Self::encode_corpus(corpus, embedder, strategy)?;
                let status = match cache.store(&key, &index.to_cached()) {
                    Ok(()) => CacheStatus::Miss,
                    Err(e) => CacheStatus::Unavailable {
                        reason: e.to_string(),
                    },
                };
                Ok((index, key, status))
            }
            Err(e) => {
                let index = Self::encode_corpus(corpus, embedder, strategy)?;
                Ok((
                    index,
                    key,
                    CacheStatus::Unavailable {
                        reason: e.to_string(),
                    },
                ))
            }
        }
    }

    fn encode_corpus(
        corpus: &Corpus,
        embedder: &dyn Embedder,
        strategy: EncodingStrategy,
    ) -> Result<Self, VeritasError> {
        let mut texts = Vec::new();
        let mut ranges = Vec::with_capacity(corpus.len());
        for (_, article) in corpus.iter() {
            let start = texts.len() as u32;
            texts.extend(strategy.encode(article));
            ranges.push((start, texts.len() as u32));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        let mut dimension: Option<usize> = None;
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let embedded = embedder.embed(batch)?;
            if embedded.len() != batch.len() {
                return Err(VeritasError::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            for mut vector in embedded {
                let expected = *dimension.get_or_insert(vector.len());
                if vector.len() != expected {
                    return Err(VeritasError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                l2_normalize(&mut vector);
                vectors.push(vector);
            }
        }

        Ok(Self {
            strategy,
            dimension: dimension.unwrap_or(0),
            vectors,
            ranges,
        })
    }

    fn to_cached(&self) -> CachedEmbeddings {
        CachedEmbeddings {
            dimension: self.dimension as u32,
            ranges: self.ranges.clone(),
            vectors: self.vectors.clone(),
        }
    }

    #[must_use]
    pub fn strategy(&self) -> EncodingStrategy {
        self.strategy
    }

    /// Vector dimension (0 for an empty index).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Total number of stored vectors.
    #[must_use]
    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    /// Number of indexed articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Max-sim cosine score of every article for `query`, indexed by `ArticleId`.
    pub fn scores(&self, query: &str, embedder: &dyn Embedder) -> Result<Vec<f32>, VeritasError> {
        if self.vectors.is_empty() {
            return Ok(vec![0.0; self.ranges.len()]);
        }
        let mut embedded = embedder.embed(&[query.to_string()])?;
        let mut query_vector = embedded
            .pop()
            .ok_or_else(|| VeritasError::Embedding("embedder returned no vector".to_string()))?;
        if query_vector.len() != self.dimension {
            return Err(VeritasError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }
        l2_normalize(&mut query_vector);

        let scores = self
            .ranges
            .iter()
            .map(|&(start, end)| {
                self.vectors[start as usize..end as usize]
                    .iter()
                    .map(|v| dot(&query_vector, v))
                    .fold(None, |best: Option<f32>, s| {
                        Some(best.map_or(s, |b| b.max(s)))
                    })
                    .unwrap_or(0.0)
            })
            .collect();
        Ok(scores)
    }

    /// Top-k articles with a positive similarity.
    pub fn top_k(
        &self,
        query: &str,
        embedder: &dyn Embedder,
        k: usize,
    ) -> Result<Vec<ScoredArticle>, VeritasError> {
        Ok(top_k(&self.scores(query, embedder)?, k))
    }
}

// =============================================================================
// TESTS
// =============================================================================
