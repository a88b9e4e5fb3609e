//! In-memory vector store: chunks, metadata, and a nearest-neighbor index.
//!
//! The store accumulates chunks from any number of documents with
//! [`VectorStore::add_document`], embeds them all at once in
//! [`VectorStore::build`], and answers similarity queries with
//! [`VectorStore::search`].
//!
//! ```text
//! add_document ─┐
//! add_document ─┼─▶ chunks + metadata ──build()──▶ FlatL2Index
//! add_document ─┘                                     │
//!                         search(query, k) ◀──────────┘
//! ```
//!
//! After a successful build `chunks.len() == metadata.len() == index.len()`.
//! Adding documents after a build leaves the index stale until the next
//! `build()`; searches only ever see chunks that were indexed.

use thiserror::Error;

use crate::chunk::chunk_document;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::index::{FlatL2Index, IndexError, VectorIndex};
use crate::models::{Chunk, ChunkMetadata, SearchHit};

pub use crate::chunk::DEFAULT_MAX_CHARS;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("No chunks to index.")]
    EmptyIndex,
    #[error("Index not built.")]
    NotBuilt,
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("embedder returned {actual} vectors for {expected} chunks")]
    VectorCount { expected: usize, actual: usize },
    #[error(transparent)]
    Dimension(#[from] IndexError),
}

pub struct VectorStore {
    chunks: Vec<Chunk>,
    metadata: Vec<ChunkMetadata>,
    index: Option<FlatL2Index>,
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            metadata: Vec::new(),
            index: None,
        }
    }

    /// Chunk `text` and append the pieces, tagged with `source`.
    pub fn add_document(&mut self, text: &str, source: &str, max_chars: usize) {
        for chunk in chunk_document(text, source, max_chars) {
            self.metadata.push(ChunkMetadata::from(&chunk));
            self.chunks.push(chunk);
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    /// Embed every chunk and replace the index.
    ///
    /// On failure the previous index (if any) is discarded as well.
    pub async fn build(&mut self, embedder: &dyn EmbeddingProvider) -> Result<(), VectorStoreError> {
        self.index = None;

        if self.chunks.is_empty() {
            return Err(VectorStoreError::EmptyIndex);
        }

        let texts: Vec<String> = self.chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .map_err(|e| VectorStoreError::Embedding(format!("{:#}", e)))?;

        if vectors.len() != texts.len() {
            return Err(VectorStoreError::VectorCount {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        let mut index = FlatL2Index::new(dims);
        index.add(&vectors)?;

        tracing::debug!(
            chunks = self.chunks.len(),
            dims,
            model = embedder.model_name(),
            "vector index built"
        );

        self.index = Some(index);
        Ok(())
    }

    /// Return the `top_k` chunks nearest to `query`, closest first.
    pub async fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let index = self.index.as_ref().ok_or(VectorStoreError::NotBuilt)?;

        let query_vec = embed_query(embedder, query)
            .await
            .map_err(|e| VectorStoreError::Embedding(format!("{:#}", e)))?;

        let neighbors = index.search(&query_vec, top_k)?;

        Ok(neighbors
            .into_iter()
            .map(|n| SearchHit {
                text: self.chunks[n.position].text.clone(),
                metadata: self.metadata[n.position].clone(),
                distance: n.distance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    /// Letter-frequency embedder: deterministic, and identical text maps
    /// to an identical vector.
    struct Letters;

    #[async_trait]
    impl EmbeddingProvider for Letters {
        fn model_name(&self) -> &str {
            "letters"
        }
        fn dims(&self) -> usize {
            26
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes() {
                        if c.is_ascii_lowercase() {
                            v[(c - b'a') as usize] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl EmbeddingProvider for Failing {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            0
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("model not loaded")
        }
    }

    fn store_with(docs: &[(&str, &str)]) -> VectorStore {
        let mut store = VectorStore::new();
        for (text, source) in docs {
            store.add_document(text, source, DEFAULT_MAX_CHARS);
        }
        store
    }

    #[tokio::test]
    async fn test_search_before_build_fails() {
        let store = store_with(&[("hello", "a")]);
        let err = store.search(&Letters, "hello", 1).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::NotBuilt));
    }

    #[tokio::test]
    async fn test_build_empty_fails() {
        let mut store = VectorStore::new();
        let err = store.build(&Letters).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::EmptyIndex));
        assert!(!store.is_built());
    }

    #[tokio::test]
    async fn test_build_with_blank_document_is_empty() {
        let mut store = store_with(&[("   \n\n", "blank")]);
        assert!(store.is_empty());
        assert!(matches!(
            store.build(&Letters).await,
            Err(VectorStoreError::EmptyIndex)
        ));
    }

    #[tokio::test]
    async fn test_result_count_is_min_of_k_and_len() {
        let mut store = store_with(&[
            ("alpha", "a"),
            ("bravo", "b"),
            ("charlie", "c"),
        ]);
        store.build(&Letters).await.unwrap();
        for k in 0..6 {
            let hits = store.search(&Letters, "delta", k).await.unwrap();
            assert_eq!(hits.len(), k.min(3));
        }
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first_and_distances_ascend() {
        let mut store = store_with(&[
            ("zebra crossing", "z"),
            ("The cat sat on the mat.", "doc1"),
            ("quick brown fox", "q"),
        ]);
        store.build(&Letters).await.unwrap();

        let hits = store
            .search(&Letters, "The cat sat on the mat.", 3)
            .await
            .unwrap();
        assert_eq!(hits[0].metadata.source, "doc1");
        assert!(hits[0].distance.abs() < 1e-6);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn test_metadata_chunk_ids_are_local() {
        let long = (0..40)
            .map(|i| format!("sentence number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let mut store = VectorStore::new();
        store.add_document(&long, "first", 100);
        store.add_document("short one", "second", 100);

        let meta = store.metadata();
        assert_eq!(meta.len(), store.chunks().len());
        assert_eq!(meta[0].chunk_id, 0);
        let last = meta.last().unwrap();
        assert_eq!(last.source, "second");
        assert_eq!(last.chunk_id, 0);
    }

    #[tokio::test]
    async fn test_embedder_failure_surfaces() {
        let mut store = store_with(&[("text", "a")]);
        let err = store.build(&Failing).await.unwrap_err();
        match err {
            VectorStoreError::Embedding(msg) => assert!(msg.contains("model not loaded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rebuild_sees_new_chunks() {
        let mut store = store_with(&[("alpha", "a")]);
        store.build(&Letters).await.unwrap();
        store.add_document("omega", "o", DEFAULT_MAX_CHARS);
        assert_eq!(store.search(&Letters, "omega", 5).await.unwrap().len(), 1);

        store.build(&Letters).await.unwrap();
        let hits = store.search(&Letters, "omega", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.source, "o");
    }
}
