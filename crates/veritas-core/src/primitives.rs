//! # Engine Primitives
//!
//! Compiled-in constants for the retrieval and verdict engine.
//!
//! These values are fixed at build time and are immutable at runtime.
//! Anything a deployment may want to tune lives in the app configuration
//! and only defaults to the values below.

// =============================================================================
// CHUNKING & ENCODING
// =============================================================================

/// Characters per chunk for the `chunk_pool` encoding strategy.
///
/// Chunks are non-overlapping; the final chunk of an article may be shorter.
pub const CHUNK_SIZE: usize = 500;

/// Characters of `full_text` kept by the `truncate` encoding strategy.
pub const TRUNCATE_LENGTH: usize = 512;

/// Number of texts sent to the embedder per call during index build.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Separator between title, subtitle and label for `title_label` encoding.
pub const TITLE_LABEL_SEPARATOR: &str = " — ";

// =============================================================================
// LEXICAL SCORING
// =============================================================================

/// Minimum token length kept by the tokenizer.
pub const MIN_TOKEN_LENGTH: usize = 2;

/// BM25 term-frequency saturation.
pub const BM25_K1: f32 = 1.5;

/// BM25 document-length normalization.
pub const BM25_B: f32 = 0.75;

// =============================================================================
// RETRIEVAL DEFAULTS
// =============================================================================

/// Characters of body text copied into an evidence snippet.
pub const SNIPPET_LENGTH: usize = 300;

/// Default number of results per question.
pub const DEFAULT_K: usize = 5;

/// Default number of results per query in multi-query retrieval.
pub const DEFAULT_K_PER_QUERY: usize = 3;

/// Default number of merged results in multi-query retrieval.
pub const DEFAULT_K_TOTAL: usize = 5;

/// Weight of the lexical score in hybrid retrieval (semantic gets the rest).
pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.5;

/// A question with fewer local results than this is supplemented with web
/// results in fallback-hybrid mode.
pub const MIN_LOCAL_RESULTS: usize = 2;

/// Upper bound on `k` accepted from callers.
pub const MAX_K: usize = 100;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Magic bytes for the embedding cache blob header.
pub const MAGIC_BYTES: &[u8; 4] = b"VRTS";

/// Current embedding cache blob format version.
///
/// Increment this when making breaking changes to the blob layout.
pub const FORMAT_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"VRTS");
    }

    #[test]
    fn truncation_covers_at_least_one_chunk() {
        assert!(TRUNCATE_LENGTH >= CHUNK_SIZE);
        assert!(SNIPPET_LENGTH < CHUNK_SIZE);
    }
}
