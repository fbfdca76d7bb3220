//! Splits documents into overlapping chunks.
//!
//! Text is first cut on a literal separator (a newline by default). The
//! resulting segments are then packed greedily into chunks of at most
//! `chunk_size` characters, and each new chunk starts with the tail of the
//! previous one (up to `chunk_overlap` characters) so context survives the
//! boundary.
//!
//! Segments are never cut. A single segment longer than `chunk_size` becomes
//! an oversized chunk of its own and a warning is logged.

use super::types::{Chunk, Document};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Separator-based text splitter.
///
/// Lengths are counted in characters (`char`s), never bytes, so multi-byte
/// text is measured the way a reader would count it.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl TextSplitter {
    /// Creates a splitter that cuts on newlines.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkerError::InvalidConfig`] if `chunk_size` is zero or
    /// `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ChunkerError::InvalidConfig("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkerError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator: "\n".to_string(),
        })
    }

    /// Uses `separator` instead of a newline. An empty separator splits
    /// between every character.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits raw text into chunk strings, in order.
    ///
    /// Empty or whitespace-only input yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let segments: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str())
                .filter(|s| !s.is_empty())
                .collect()
        };

        self.merge_segments(&segments)
    }

    /// Splits every document and returns the chunks of all of them in order.
    ///
    /// Each chunk copies its document's metadata and adds `chunk`, the chunk's
    /// index within that document.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for document in documents {
            for (i, content) in self.split_text(&document.content).into_iter().enumerate() {
                let mut chunk = Chunk {
                    content,
                    metadata: document.metadata.clone(),
                };
                chunk.metadata.insert("chunk".to_string(), i.to_string());
                chunks.push(chunk);
            }
        }

        debug!(
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "Split documents into chunks"
        );
        chunks
    }

    fn merge_segments(&self, segments: &[&str]) -> Vec<String> {
        let separator_len = self.separator.chars().count();

        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        // Characters in the window, separators between segments included
        let mut total = 0usize;

        for &segment in segments {
            let len = segment.chars().count();
            let joiner = if window.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = self.join(&window) {
                    chunks.push(chunk);
                }

                // Keep at most `chunk_overlap` characters, and only as much
                // as still leaves room for the incoming segment.
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { separator_len }
                            > self.chunk_size)
                {
                    let Some((_, first_len)) = window.pop_front() else {
                        break;
                    };
                    let joiner = if window.is_empty() { 0 } else { separator_len };
                    total -= first_len + joiner;
                }
            }

            window.push_back((segment, len));
            total += len + if window.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = self.join(&window) {
            chunks.push(chunk);
        }

        chunks
    }

    fn join(&self, window: &VecDeque<(&str, usize)>) -> Option<String> {
        let joined = window
            .iter()
            .map(|(segment, _)| *segment)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();

        if trimmed.is_empty() {
            return None;
        }

        let len = trimmed.chars().count();
        if len > self.chunk_size {
            warn!(
                "Created a chunk of size {}, which is longer than the specified {}",
                len, self.chunk_size
            );
        }

        Some(trimmed.to_string())
    }
}
