//! The embedding capability consumed by the dense index adapter.
//!
//! Production deployments inject a model-backed implementation (a local
//! model or a thin HTTP client). The crate ships [`HashEmbedder`], a
//! deterministic feature-hashing embedder, so the binary and the test suite
//! run without any model or network access.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use crate::error::Result;

/// Turns texts into fixed-dimension float vectors.
///
/// Contract: one vector per input text, in the same order. An unavailable
/// backend fails the call with a typed error; the caller never retries.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of the produced vectors.
    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words embedder using feature hashing.
///
/// Each whitespace token is lowercased, hashed, and counted into one of
/// `dimension` buckets; the vector is L2-normalized. Two texts sharing
/// vocabulary land near each other under cosine similarity, which is enough
/// for ranking in tests and offline use.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn one_vector_per_text_in_order() {
        let embedder = HashEmbedder::default();
        let texts =
            vec!["first text".to_string(), "second text".to_string()];
        let vectors = embedder.embed(&texts).unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 256));
    }

    #[test]
    fn identical_texts_embed_identically() {
        let embedder = HashEmbedder::default();
        let a = embedder
            .embed(&["ladle preheat time".to_string()])
            .unwrap();
        let b = embedder
            .embed(&["ladle preheat time".to_string()])
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn vectors_are_normalized() {
        let embedder = HashEmbedder::new(64);
        let vectors = embedder
            .embed(&["some words to hash into buckets".to_string()])
            .unwrap();
        let norm = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::default();
        let vectors = embedder
            .embed(&[
                "steel ladle preheat temperature".to_string(),
                "the steel ladle must preheat".to_string(),
                "completely unrelated gardening advice".to_string(),
            ])
            .unwrap();

        let related = cosine(&vectors[0], &vectors[1]);
        let unrelated = cosine(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let vectors = embedder.embed(&["".to_string()]).unwrap();
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn tokenization_is_case_insensitive() {
        let embedder = HashEmbedder::default();
        let vectors = embedder
            .embed(&["Preheat The Ladle".to_string(), "preheat the ladle".into()])
            .unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }
}
