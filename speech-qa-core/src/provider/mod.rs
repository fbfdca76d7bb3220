//! LLM provider abstraction layer.
//!
//! This module defines a common interface for LLM backends to provide chat
//! completions and embeddings. Ollama is the only backend shipped.

mod types;
pub mod ollama;

// Re-export common types
pub use types::{
    ChatRequest,
    ChatResponse,
    EmbedRequest,
    EmbedResponse,
    Message,
    Provider,
    ProviderError,
    Result,
    Role,
};

// Re-export provider implementations
pub use ollama::OllamaProvider;
