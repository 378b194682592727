//! # Core Type Definitions
//!
//! Identifiers, source keys and the error type shared by every module:
//! - Corpus positions (`ArticleId`)
//! - Source datasets (`SourceKey`)
//! - Scored hits (`ScoredArticle`)
//! - Error types (`VeritasError`)
//!
//! ## Determinism Guarantees
//!
//! - `ArticleId` is the insertion position and the final tie-breaker in every ranking
//! - `SourceKey` is a closed enumeration with a fixed on-disk layout

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// ARTICLE IDENTIFIERS
// =============================================================================

/// Position of an article in the corpus (insertion order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub usize);

impl ArticleId {
    /// Get the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An article paired with a method-specific score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: ArticleId,
    pub score: f32,
}

impl ScoredArticle {
    #[must_use]
    pub const fn new(article: ArticleId, score: f32) -> Self {
        Self { article, score }
    }
}

// =============================================================================
// SOURCE KEYS
// =============================================================================

/// The fact-checking datasets the corpus is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKey {
    G1,
    Lupa,
    AosFatos,
    Estadao,
    Boatos,
    Confere,
}

impl SourceKey {
    /// Every source, in load order.
    pub const ALL: [SourceKey; 6] = [
        SourceKey::G1,
        SourceKey::Lupa,
        SourceKey::AosFatos,
        SourceKey::Estadao,
        SourceKey::Boatos,
        SourceKey::Confere,
    ];

    /// Short name used in evidence results and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::G1 => "g1",
            Self::Lupa => "lupa",
            Self::AosFatos => "aosfatos",
            Self::Estadao => "estadao",
            Self::Boatos => "boatos",
            Self::Confere => "confere",
        }
    }

    /// Location of the cleaned JSONL file relative to the data directory.
    #[must_use]
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::G1 => "g1/g1_cleaned.jsonl",
            Self::Lupa => "lupa/lupa_cleaned.jsonl",
            Self::AosFatos => "aosfatos/aosfatos_cleaned.jsonl",
            Self::Estadao => "estadao/estadao_cleaned.jsonl",
            Self::Boatos => "boatos_org/boatos_2020_2025_cleaned.jsonl",
            Self::Confere => "confere/confere_cleaned.jsonl",
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKey {
    type Err = VeritasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| VeritasError::InvalidArgument(format!("unknown source: {s}")))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the engine.
///
/// - No silent failures
/// - The engine should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum VeritasError {
    /// No article could be loaded from any configured source.
    #[error("Corpus is empty: no source could be loaded")]
    EmptyCorpus,

    /// The embedding model failed or returned an unusable batch.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vectors of different dimensions were mixed.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding cache could not be opened, read or written.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// A caller-supplied value was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

// =============================================================================
// TESTS
// =============================================================================
