//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus the pure distance function used by the vector index.
//!
//! Concrete provider implementations (fastembed, OpenAI, Ollama) live in
//! the `ragdesk` app crate.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding providers.
///
/// A provider maps a batch of texts to one fixed-length vector each. All
/// vectors produced by one provider have the same dimensionality, and the
/// same text always maps to the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query string.
pub async fn embed_query(provider: &dyn EmbeddingProvider, query: &str) -> Result<Vec<f32>> {
    let mut vectors = provider.embed(&[query.to_string()]).await?;
    match vectors.pop() {
        Some(v) if vectors.is_empty() => Ok(v),
        _ => anyhow::bail!("embedding provider returned an unexpected number of vectors"),
    }
}

/// Squared Euclidean distance between two vectors.
///
/// Callers must ensure both vectors have the same length; extra trailing
/// components of the longer vector are ignored.
///
/// # Example
///
/// ```rust
/// use ragdesk_core::embedding::squared_l2;
///
/// assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
/// ```
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
