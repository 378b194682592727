//! # Storage Module
//!
//! Disk-backed stores used by the engine.

mod embedding_cache;

pub use embedding_cache::{CACHE_FILE_NAME, EmbeddingCache};
