//! Embedding provider trait and deterministic implementations.
//!
//! This module defines the `EmbeddingProvider` trait that abstracts over
//! embedding generation backends. The engine calls it once per request and
//! propagates its failures unchanged; timeouts and cancellation belong to
//! the caller.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic fixed-dimension vectors for testing
//! - `StaticEmbeddingProvider`: Explicit text → vector table for testing
//! - `FastEmbedProvider`: Local embedding via fastembed (requires `fastembed` feature)

use async_trait::async_trait;
use jobmatch_core::{Error, Result};
use std::collections::HashMap;

/// Trait for generating text embeddings.
///
/// Implementations must be deterministic for a given model version and
/// always return vectors of [`dimension`](Self::dimension) components.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    /// Backends that support native batching should override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// MockEmbeddingProvider
// ============================================================================

/// A mock embedding provider for testing.
///
/// Generates deterministic vectors from the input bytes, producing
/// consistent embeddings for the same input.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        if bytes.is_empty() {
            return vec![0.0; self.dimension];
        }

        let mut embedding: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let byte_val = bytes[i % bytes.len()];
                ((f32::from(byte_val) + i as f32) % 256.0) / 256.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.deterministic_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| self.deterministic_embedding(t))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// StaticEmbeddingProvider
// ============================================================================

/// Provider backed by an explicit lookup table.
///
/// Unknown texts fail with [`Error::Operation`], which makes it useful for
/// checking that provider errors reach the caller untouched.
#[derive(Debug, Clone, Default)]
pub struct StaticEmbeddingProvider {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl StaticEmbeddingProvider {
    /// Create an empty table for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dimension,
        }
    }

    /// Register the vector returned for `text`.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| Error::operation(format!("no embedding registered for '{text}'")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_creation() {
        let provider = MockEmbeddingProvider::new(384);
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.name(), "mock");
    }

    #[tokio::test]
    async fn test_mock_embed_single() {
        let provider = MockEmbeddingProvider::new(8);
        let embedding = provider.embed("hello world").await.unwrap();

        assert_eq!(embedding.len(), 8);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_mock_embed_deterministic() {
        let provider = MockEmbeddingProvider::new(16);
        let e1 = provider.embed("same text").await.unwrap();
        let e2 = provider.embed("same text").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_mock_embed_empty_text_is_zero() {
        let provider = MockEmbeddingProvider::new(4);
        let embedding = provider.embed("").await.unwrap();
        assert_eq!(embedding, vec![0.0; 4]);
    }

    #[tokio::test]
    async fn test_mock_batch_matches_single() {
        let provider = MockEmbeddingProvider::new(8);
        let batch = provider.embed_batch(&["a", "bc"]).await.unwrap();
        assert_eq!(batch[0], provider.embed("a").await.unwrap());
        assert_eq!(batch[1], provider.embed("bc").await.unwrap());
    }

    #[tokio::test]
    async fn test_static_provider_lookup() {
        let provider = StaticEmbeddingProvider::new(2).with_vector("dev", vec![1.0, 0.0]);
        assert_eq!(provider.embed("dev").await.unwrap(), vec![1.0, 0.0]);
        assert!(matches!(
            provider.embed("missing").await,
            Err(Error::Operation(_))
        ));
    }

    #[tokio::test]
    async fn test_static_provider_default_batch() {
        let provider = StaticEmbeddingProvider::new(2)
            .with_vector("a", vec![1.0, 0.0])
            .with_vector("b", vec![0.0, 1.0]);
        let batch = provider.embed_batch(&["b", "a"]).await.unwrap();
        assert_eq!(batch, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn EmbeddingProvider) {}
    }
}
