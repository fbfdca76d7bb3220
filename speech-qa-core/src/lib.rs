//! speech-qa-core - Question answering over a single speech
//!
//! Provides the building blocks of a retrieval augmented QA pipeline:
//! - LLM provider abstraction (Ollama)
//! - RAG: loading, chunking, embedding and a persistent vector index
//! - Grounded answer generation
//! - Configuration management
//!
//! ## Primary API
//!
//! Most callers only need [`pipeline::setup`], which returns a
//! [`Session`] whose [`QaChain`] answers questions.

pub mod config;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod qa;
pub mod rag;

// Public exports
pub use config::{Config, ConfigError, LlmConfig, RagConfig, StorageConfig};
pub use models::{EmbeddingModel, ModelRegistry};
pub use pipeline::{setup, IndexOrigin, Session, SetupError, SetupOptions};
pub use qa::{GroundedPrompt, QaChain, QaError, QueryResult};
pub use rag::RagEngine;

// Provider exports
pub use provider::{ChatRequest, ChatResponse, Message, OllamaProvider, Provider, ProviderError};
