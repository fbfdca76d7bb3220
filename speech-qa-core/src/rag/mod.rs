//! Retrieval Augmented Generation (RAG) building blocks.
//!
//! # Architecture
//!
//! - [`loader`]: reads the source text file into a [`Document`]
//! - [`chunker`]: splits documents into overlapping [`Chunk`]s
//! - [`embedder`]: converts text to normalized vectors via a provider
//! - [`store`]: persistent vector index with similarity search
//! - [`RagEngine`]: ties an embedder to a store
//!
//! # How It Works
//!
//! 1. **Indexing Phase** (once, or on rebuild):
//!    - The document is split into chunks (default: 500 characters with 50 overlap)
//!    - Each chunk is converted to a vector embedding
//!    - Embeddings are written to the index directory
//!
//! 2. **Retrieval Phase** (every question):
//!    - The question is converted to a vector embedding
//!    - The index returns the top-k most similar chunks
//!
//! Generation from the retrieved chunks lives in [`crate::qa`].

pub mod chunker;
pub mod embedder;
mod lancedb_store;
pub mod loader;
pub mod store;
mod types;

pub use chunker::{ChunkerError, TextSplitter};
pub use embedder::{Embedder, EmbedderError};
pub use lancedb_store::LanceDbStore;
pub use loader::{load_document, LoaderError};
pub use store::{connect_vector_store, OpenMode, StoreError, VectorStore};
pub use types::{Chunk, Document, Metadata, Record, SearchResult};

use crate::config::StorageConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Chunks embedded per provider request while building the index.
const BATCH_SIZE: usize = 32;

/// An embedder bound to a vector store.
///
/// The engine is `Clone`; clones share the same store handle and the same
/// embedder readiness state.
#[derive(Clone)]
pub struct RagEngine {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
}

impl RagEngine {
    /// Wraps an already connected store.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Builds a fresh index from `chunks`.
    ///
    /// Any collection of the same name at `storage.path` is replaced. Every
    /// chunk is embedded and written, so afterwards [`count`](Self::count)
    /// equals `chunks.len()`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding any chunk fails or the store cannot be
    /// written. There is no partial result; a failed build must be rerun.
    pub async fn build(chunks: Vec<Chunk>, embedder: Embedder, storage: &StorageConfig) -> Result<Self> {
        info!(path = %storage.path.display(), collection = %storage.collection_name, "Creating vector store");
        let store = connect_vector_store(storage, embedder.dimension(), OpenMode::Create).await?;
        let engine = Self::new(embedder, store);

        engine.index_chunks(chunks).await?;

        let count = engine.count().await?;
        info!("Vector store created with {} embeddings", count);
        Ok(engine)
    }

    /// Attaches to an index built earlier, without chunking or embedding anything.
    pub async fn load(embedder: Embedder, storage: &StorageConfig) -> Result<Self> {
        info!(path = %storage.path.display(), collection = %storage.collection_name, "Loading existing vector store");
        let store = connect_vector_store(storage, embedder.dimension(), OpenMode::Open).await?;
        let engine = Self::new(embedder, store);

        let count = engine.count().await?;
        info!("Vector store loaded with {} embeddings", count);
        Ok(engine)
    }

    /// Embeds and stores `chunks` in batches, returning how many were stored.
    pub async fn index_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        info!("Embedding {} chunks (this may take a moment)", chunks.len());

        let mut stored = 0;
        let mut pending = chunks.into_iter().enumerate().peekable();

        while pending.peek().is_some() {
            let batch: Vec<(usize, Chunk)> = pending.by_ref().take(BATCH_SIZE).collect();
            let texts: Vec<&str> = batch.iter().map(|(_, c)| c.content.as_str()).collect();

            debug!(batch = texts.len(), "Embedding batch");
            let vectors = self.embedder.embed_batch(&texts).await?;

            let records: Vec<Record> = batch
                .into_iter()
                .zip(vectors)
                .map(|((i, chunk), vector)| {
                    let id = format!("{}_chunk_{}", chunk.source().unwrap_or("text"), i);
                    Record::new(id, chunk, vector)
                })
                .collect();

            stored += records.len();
            self.store.add(records).await?;
        }

        Ok(stored)
    }

    /// Finds the `k` stored chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.store.search(&query_embedding, k).await?;

        for (i, result) in results.iter().enumerate() {
            debug!(rank = i + 1, score = result.score, source = ?result.chunk.source(), "Retrieved chunk");
        }

        Ok(results)
    }

    /// Number of records in the index.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.count().await?)
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{embedding_model, HashProvider};
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            path: dir.path().join("index"),
            collection_name: "speech".to_string(),
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Chunk::new(*t)
                    .with_metadata("source", "speech.txt")
                    .with_metadata("chunk", i.to_string())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_build_stores_every_chunk_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(HashProvider::default());
        let embedder = Embedder::new(provider, embedding_model());
        let input: Vec<String> = (0..70).map(|i| format!("sentence number {}", i)).collect();
        let input: Vec<&str> = input.iter().map(String::as_str).collect();

        for _ in 0..2 {
            let engine = RagEngine::build(chunks(&input), embedder.clone(), &storage(&dir))
                .await
                .unwrap();
            assert_eq!(engine.count().await.unwrap(), 70);
        }
    }

    #[tokio::test]
    async fn test_load_does_not_embed_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(HashProvider::default());
        let embedder = Embedder::new(provider.clone(), embedding_model());

        RagEngine::build(chunks(&["liberty", "equality", "fraternity"]), embedder.clone(), &storage(&dir))
            .await
            .unwrap();
        let embedded_while_building = provider.embedded();
        assert_eq!(embedded_while_building, 3);

        let engine = RagEngine::load(embedder, &storage(&dir)).await.unwrap();
        assert_eq!(engine.count().await.unwrap(), 3);
        assert_eq!(provider.embedded(), embedded_while_building);
    }

    #[tokio::test]
    async fn test_load_without_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Embedder::new(Arc::new(HashProvider::default()), embedding_model());

        let result = RagEngine::load(embedder, &storage(&dir)).await;
        assert!(matches!(
            result,
            Err(RagError::Store(StoreError::CollectionNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_search_returns_most_similar_first() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Embedder::new(Arc::new(HashProvider::default()), embedding_model());
        let engine = RagEngine::build(
            chunks(&[
                "The caste system divides labourers.",
                "The Constitution recognizes the right to equality.",
                "Rivers flow to the sea.",
            ]),
            embedder,
            &storage(&dir),
        )
        .await
        .unwrap();

        let results = engine.search("What does the Constitution recognize about equality?", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].chunk.content,
            "The Constitution recognizes the right to equality."
        );
        assert_eq!(results[0].chunk.source(), Some("speech.txt"));
    }
}
