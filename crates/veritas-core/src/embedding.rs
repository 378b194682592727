//! # Embedding
//!
//! The `Embedder` seam plus the vector helpers the semantic index needs.
//!
//! Implementations are synchronous. A network-backed embedder must only be
//! driven from a blocking thread.

use crate::VeritasError;
use crate::text::tokenize;

/// Turns texts into fixed-dimension vectors.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model; part of the cache fingerprint.
    fn model_id(&self) -> &str;

    /// Embed a batch of texts, one vector per text, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VeritasError>;
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Dot product; equals cosine similarity for unit vectors.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// =============================================================================
// HASHING EMBEDDER
// =============================================================================

/// Deterministic in-process embedder.
///
/// Each token is hashed into one dimension and its frequency accumulated,
/// then the vector is L2-normalized. No model, no network; two texts sharing
/// vocabulary get a positive similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbedder {
    /// Create an embedder producing `dimensions`-wide vectors (at least 1).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_id: format!("hashing-{dimensions}"),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            vector[djb2(&token) % self.dimensions] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VeritasError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn djb2(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_yields_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((dot(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_survives_normalization() {
        let mut v = vec![0.0; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["vacinas causam autismo".to_string()];
        let a = embedder.embed(&texts).expect("embed");
        let b = embedder.embed(&texts).expect("embed");
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }

    #[test]
    fn shared_vocabulary_is_similar() {
        let embedder = HashingEmbedder::new(128);
        let vectors = embedder
            .embed(&[
                "vacinas causam autismo".to_string(),
                "É falso que vacinas causam autismo".to_string(),
                "".to_string(),
            ])
            .expect("embed");
        assert!(dot(&vectors[0], &vectors[1]) > 0.5);
        assert_eq!(dot(&vectors[0], &vectors[2]), 0.0);
    }

    #[test]
    fn model_id_includes_dimensions() {
        assert_eq!(HashingEmbedder::new(32).model_id(), "hashing-32");
    }
}
