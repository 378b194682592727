//! # Formats Module
//!
//! Binary serialization formats. File and database I/O lives in `storage`.

mod persistence;

pub use persistence::{
    CachedEmbeddings, MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, embeddings_from_bytes,
    embeddings_to_bytes,
};
