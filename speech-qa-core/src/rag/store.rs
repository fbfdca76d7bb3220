//! Vector store abstraction and factory.
//!
//! This module provides a unified interface over the persistent vector index.

use super::lancedb_store::LanceDbStore;
use super::types::{Record, SearchResult};
use crate::config::StorageConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection '{collection}' does not exist in {}", .path.display())]
    CollectionNotFound { collection: String, path: PathBuf },

    #[error("Index stores {found}-dimensional vectors but the embedder produces {expected}; rebuild the index")]
    DimensionMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified interface for vector database operations.
///
/// A store holds records of one fixed vector width, reported by
/// [`dimension`](VectorStore::dimension).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends records to the store.
    async fn add(&self, records: Vec<Record>) -> Result<()>;

    /// Searches for the most similar records using cosine similarity.
    ///
    /// # Arguments
    ///
    /// * `query_embedding` - The embedding vector to search for
    /// * `top_k` - Maximum number of results to return
    ///
    /// # Returns
    ///
    /// At most `top_k` results, sorted by descending similarity score.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Returns the total number of records in the store.
    async fn count(&self) -> Result<usize>;

    /// Removes all records from the store.
    async fn clear(&self) -> Result<()>;

    /// Width of the stored vectors.
    fn dimension(&self) -> usize;
}

/// How to attach to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Start from an empty collection, replacing any existing one.
    Create,
    /// Attach to an existing collection; fail if it is missing.
    Open,
}

/// Connects to the vector store described by `storage`.
///
/// # Arguments
///
/// * `storage` - Index directory and collection name
/// * `dimension` - Width of the embedding vectors
/// * `mode` - Whether to recreate or attach to the collection
pub async fn connect_vector_store(
    storage: &StorageConfig,
    dimension: usize,
    mode: OpenMode,
) -> Result<Arc<dyn VectorStore>> {
    let store = match mode {
        OpenMode::Create => {
            LanceDbStore::create(&storage.path, &storage.collection_name, dimension).await?
        }
        OpenMode::Open => {
            LanceDbStore::open(&storage.path, &storage.collection_name, dimension).await?
        }
    };
    Ok(Arc::new(store))
}
