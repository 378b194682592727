//! # Persistence Format
//!
//! Binary serialization for cached embedding vectors.
//!
//! Format: Header (5 bytes) + postcard-serialized payload.
//! - 4 bytes: Magic ("VRTS")
//! - 1 byte: Version
//!
//! Storage of the resulting blobs lives in `storage::embedding_cache`.
//!
//! ## Validation
//!
//! Size limits and the header are checked before the payload is parsed, and
//! the decoded payload is checked for internal consistency (ranges within the
//! vector list, every vector of the declared dimension).

use crate::{VeritasError, primitives};
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted blob size.
///
/// Checked BEFORE deserialization so a corrupted entry cannot trigger a huge
/// allocation.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 1024 * 1024 * 1024; // 1 GB

/// Minimum valid blob size (header only).
const MIN_BLOB_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The persistence header precedes every cached payload.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), VeritasError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(VeritasError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(VeritasError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VeritasError> {
        if bytes.len() < MIN_BLOB_SIZE {
            return Err(VeritasError::DeserializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Vectors of a built semantic index, grouped per article.
///
/// `ranges[i]` is the `(start, end)` slice of `vectors` owned by article `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEmbeddings {
    pub dimension: u32,
    pub ranges: Vec<(u32, u32)>,
    pub vectors: Vec<Vec<f32>>,
}

impl CachedEmbeddings {
    /// Check that ranges are contiguous, in bounds, and vectors share one dimension.
    pub fn validate(&self) -> Result<(), VeritasError> {
        let mut expected_start = 0u32;
        for &(start, end) in &self.ranges {
            if start != expected_start || end < start {
                return Err(VeritasError::DeserializationError(format!(
                    "Non-contiguous vector range ({start}, {end})"
                )));
            }
            expected_start = end;
        }
        if expected_start as usize != self.vectors.len() {
            return Err(VeritasError::DeserializationError(format!(
                "Ranges cover {} vectors but {} are stored",
                expected_start,
                self.vectors.len()
            )));
        }
        let dimension = self.dimension as usize;
        if let Some(bad) = self.vectors.iter().find(|v| v.len() != dimension) {
            return Err(VeritasError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize cached embeddings to bytes (header + payload).
///
/// This is a pure transformation - no file I/O.
pub fn embeddings_to_bytes(cached: &CachedEmbeddings) -> Result<Vec<u8>, VeritasError> {
    let header = PersistenceHeader::new();
    let payload =
        postcard::to_stdvec(cached).map_err(|e| VeritasError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_BLOB_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize cached embeddings from bytes.
///
/// Validates size and header before parsing, then the payload's shape.
pub fn embeddings_from_bytes(bytes: &[u8]) -> Result<CachedEmbeddings, VeritasError> {
    if bytes.len() < MIN_BLOB_SIZE {
        return Err(VeritasError::DeserializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(VeritasError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let cached: CachedEmbeddings = postcard::from_bytes(&bytes[MIN_BLOB_SIZE..]).map_err(|e| {
        VeritasError::DeserializationError(format!("Failed to decode embeddings: {}", e))
    })?;
    cached.validate()?;
    Ok(cached)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CachedEmbeddings {
        CachedEmbeddings {
            dimension: 3,
            ranges: vec![(0, 2), (2, 3)],
            vectors: vec![
                vec![0.1, 0.2, 0.3],
                vec![-0.0, f32::MIN_POSITIVE, 1.0 / 3.0],
                vec![0.577_350_3, 0.577_350_3, 0.577_350_3],
            ],
        }
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored.magic, *primitives::MAGIC_BYTES);
        assert_eq!(restored.version, primitives::FORMAT_VERSION);
    }

    #[test]
    fn vectors_roundtrip_bit_exact() {
        let original = sample();
        let bytes = embeddings_to_bytes(&original).expect("serialize");
        let restored = embeddings_from_bytes(&bytes).expect("deserialize");

        for (a, b) in original.vectors.iter().zip(&restored.vectors) {
            let a_bits: Vec<u32> = a.iter().map(|x| x.to_bits()).collect();
            let b_bits: Vec<u32> = b.iter().map(|x| x.to_bits()).collect();
            assert_eq!(a_bits, b_bits);
        }
        assert_eq!(original.ranges, restored.ranges);
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut bytes = embeddings_to_bytes(&sample()).expect("serialize");
        bytes[0] = b'X';
        assert!(embeddings_from_bytes(&bytes).is_err());
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = embeddings_to_bytes(&sample()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(embeddings_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_data_rejected() {
        assert!(embeddings_from_bytes(b"VRT").is_err());
        let bytes = embeddings_to_bytes(&sample()).expect("serialize");
        assert!(embeddings_from_bytes(&bytes[..bytes.len() - 4]).is_err());
    }

    #[test]
    fn inconsistent_ranges_rejected() {
        let mut cached = sample();
        cached.ranges = vec![(0, 1), (2, 3)];
        assert!(cached.validate().is_err());

        let mut short = sample();
        short.vectors[1].pop();
        assert!(matches!(
            short.validate(),
            Err(VeritasError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
