//! Grounded question answering over retrieved chunks.
//!
//! A [`QaChain`] retrieves the chunks most similar to a question, renders them
//! into a fixed prompt that tells the model to answer only from that context,
//! and streams the model's reply.
//!
//! ```text
//! question → Retriever (top k chunks) → GroundedPrompt → Generator → answer
//! ```

use crate::provider::{self, ChatRequest, ChatResponse, Message, Provider, ProviderError};
use crate::rag::{Chunk, RagEngine, RagError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RagError),

    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, QaError>;

/// Number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Sentence the model is told to use when the context lacks the answer.
pub const FALLBACK_PHRASE: &str = "I cannot find this information in the provided text.";

/// Source of context chunks for a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns up to `k` chunks, most relevant first.
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<Chunk>, RagError>;
}

/// A chat model that can complete a conversation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Completes `messages`, passing each piece of text to `on_token` as it
    /// arrives, and returns the full reply.
    async fn complete(
        &self,
        messages: &[Message],
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> provider::Result<String>;
}

#[async_trait]
impl Retriever for RagEngine {
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<Chunk>, RagError> {
        let results = RagEngine::search(self, query, k).await?;
        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}

/// The fixed two-turn prompt used for every question.
pub struct GroundedPrompt;

impl GroundedPrompt {
    /// Joins chunk contents into a single context block.
    pub fn context(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Renders a system turn carrying `context` and a user turn carrying
    /// the question as given.
    pub fn render(context: &str, question: &str) -> Vec<Message> {
        let system = format!(
            "Use the following context to answer the question.\n\
             If you cannot find the answer in the context, say \"{}\"\n\
             \n\
             Context: {}",
            FALLBACK_PHRASE, context
        );

        vec![Message::system(system), Message::user(question)]
    }
}

/// [`Generator`] backed by a chat model on a [`Provider`].
pub struct ProviderGenerator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for ProviderGenerator {
    async fn complete(
        &self,
        messages: &[Message],
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> provider::Result<String> {
        let request = ChatRequest::new(&self.model, messages.to_vec()).with_temperature(self.temperature);

        let mut answer = String::new();
        self.provider
            .chat(
                request,
                Box::new(|response: ChatResponse| {
                    if !response.content.is_empty() {
                        on_token(&response.content);
                        answer.push_str(&response.content);
                    }
                }),
            )
            .await?;

        Ok(answer)
    }
}

/// Answer to one question, with the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub retrieved_chunks: Vec<Chunk>,
}

/// Retrieval followed by grounded generation.
#[derive(Clone)]
pub struct QaChain {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    k: usize,
}

impl QaChain {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            k: DEFAULT_TOP_K,
        }
    }

    /// Retrieve `k` chunks per question instead of [`DEFAULT_TOP_K`].
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.k
    }

    /// Answers `question` and returns the complete reply.
    pub async fn ask(&self, question: &str) -> Result<QueryResult> {
        self.ask_stream(question, |_| {}).await
    }

    /// Answers `question`, passing each piece of the reply to `on_token` as
    /// the model produces it.
    ///
    /// # Errors
    ///
    /// [`QaError::Retrieval`] if the question cannot be embedded or the index
    /// cannot be searched, [`QaError::Generation`] if the model call fails.
    /// Nothing is retried.
    pub async fn ask_stream<F>(&self, question: &str, mut on_token: F) -> Result<QueryResult>
    where
        F: FnMut(&str) + Send,
    {
        let retrieved_chunks = self.retriever.search(question, self.k).await?;
        info!(chunks = retrieved_chunks.len(), "Retrieved context");

        let context = GroundedPrompt::context(&retrieved_chunks);
        let messages = GroundedPrompt::render(&context, question);
        debug!(context_chars = context.chars().count(), "Sending grounded prompt");

        let answer = self.generator.complete(&messages, &mut on_token).await?;

        Ok(QueryResult {
            answer,
            retrieved_chunks,
        })
    }
}
