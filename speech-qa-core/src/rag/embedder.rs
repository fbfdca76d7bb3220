//! Embedding generation using LLM providers.
//!
//! This module provides functionality to convert text into normalized vector
//! embeddings using a provider's embedding model.

use crate::models::EmbeddingModel;
use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The API response contained no embeddings.
    ///
    /// This typically indicates a problem with the model or request format.
    #[error("No embeddings returned")]
    NoEmbeddings,

    /// The model produced vectors of an unexpected width.
    #[error("Model '{model}' returned {actual}-dimensional vectors, expected {expected}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Generates L2-normalized vector embeddings for text.
///
/// An `Embedder` is bound to one embedding model. The first call makes sure
/// the model is available on the provider (which may download it); later
/// calls, including those from clones, skip that step.
///
/// The same text always maps to the same vector for a fixed model version,
/// and every vector has [`dimension`](Self::dimension) entries.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: EmbeddingModel,
    ready: Arc<OnceCell<()>>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: EmbeddingModel) -> Self {
        Self {
            provider,
            model,
            ready: Arc::new(OnceCell::new()),
        }
    }

    pub fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    /// Width of every vector this embedder produces.
    pub fn dimension(&self) -> usize {
        self.model.embedding_dim
    }

    /// Generates a normalized vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider is unreachable or the model cannot be fetched
    /// - The API returns no embeddings
    /// - The vector width differs from the configured dimension
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedderError::NoEmbeddings)
    }

    /// Embeds several texts at once, returning vectors in input order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_ready().await?;

        debug!(count = texts.len(), model = %self.model.id, "Embedding texts");
        let embeddings = self.provider.embed_batch(texts, &self.model.id).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbedderError::NoEmbeddings);
        }

        embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.len() != self.dimension() {
                    return Err(EmbedderError::DimensionMismatch {
                        model: self.model.id.clone(),
                        expected: self.dimension(),
                        actual: embedding.len(),
                    });
                }
                Ok(normalize(embedding))
            })
            .collect()
    }

    async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                info!(model = %self.model.id, "Loading embeddings model (first run may download it)");
                self.provider.ensure_model(&self.model.id).await?;
                info!(model = %self.model.id, dimension = self.dimension(), "Embeddings model ready");
                Ok::<(), EmbedderError>(())
            })
            .await?;
        Ok(())
    }
}

/// Scales `vector` to unit length. The zero vector is returned unchanged.
pub(crate) fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}
