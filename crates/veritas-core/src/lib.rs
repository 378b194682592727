//! # veritas-core
//!
//! The evidence retrieval and verdict engine for Veritas - THE LOGIC.
//!
//! This crate holds everything needed to go from a fixed fact-checking corpus
//! to ranked evidence and a verdict, without touching the network:
//! - `corpus`: loading and normalizing the source datasets
//! - `lexical` / `semantic`: the two indices
//! - `retrieval`: single- and multi-query retrieval over both
//! - `verdict`: label voting, the verdict prompt and reply parsing
//!
//! ## Architectural Constraints
//!
//! - Has NO async and NO network dependencies (pure Rust)
//! - Collaborators (embedding model) come in through the `Embedder` trait
//! - Built once, then read-only: no interior mutability, no global state
//! - Deterministic: identical inputs give identical rankings

// =============================================================================
// MODULES
// =============================================================================

pub mod corpus;
pub mod embedding;
pub mod evidence;
pub mod formats;
pub mod lexical;
pub mod primitives;
pub mod ranking;
pub mod retrieval;
pub mod semantic;
pub mod storage;
pub mod text;
pub mod types;
pub mod verdict;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ArticleId, ScoredArticle, SourceKey, VeritasError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use corpus::{Article, Corpus, LoadReport, SourceReport, SourceStatus};
pub use embedding::{Embedder, HashingEmbedder};
pub use evidence::{EvidenceBundle, EvidenceOrigin, EvidenceResult, QuestionEvidence};
pub use lexical::LexicalIndex;
pub use retrieval::{BuildReport, RetrievalEngine, RetrievalMethod, RetrievalOptions};
pub use semantic::{CacheStatus, EncodingStrategy, SemanticIndex};
pub use storage::EmbeddingCache;
pub use text::normalize_label;
pub use verdict::{
    Classification, FALSE_LABELS, LabelTone, TRUE_LABELS, Verdict, VerdictStrategy,
    build_verdict_prompt, label_majority, outer_json_span,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{CachedEmbeddings, PersistenceHeader, embeddings_from_bytes, embeddings_to_bytes};
