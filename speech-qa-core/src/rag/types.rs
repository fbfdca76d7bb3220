use std::collections::HashMap;
use std::path::Path;

/// Metadata attached to documents, chunks and stored records.
pub type Metadata = HashMap<String, String>;

/// A whole source text as read from disk.
///
/// Created by the loader and consumed by the chunker. `metadata["source"]`
/// holds the path the text was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn from_source(content: impl Into<String>, source: &Path) -> Self {
        Self::new(content).with_metadata("source", source.display().to_string())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }
}

/// A bounded slice of a document, the unit that gets embedded and retrieved.
///
/// Carries the metadata of the document it came from plus its position
/// (`chunk`) within that document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }
}

/// A chunk together with its embedding, as written to the vector store.
///
/// # Example
///
/// ```no_run
/// # use speech_qa_core::rag::{Chunk, Record};
/// let chunk = Chunk::new("Hello world").with_metadata("source", "data/speech.txt");
/// let record = Record::new("data/speech.txt_chunk_0", chunk, vec![0.6, 0.8]);
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub content: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

impl Record {
    pub fn new(id: impl Into<String>, chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: chunk.content,
            vector,
            metadata: chunk.metadata,
        }
    }
}

/// A stored chunk returned by a similarity search.
///
/// Results are ordered by descending score. With normalized embeddings and
/// cosine distance the score is `1 - distance`:
/// - `1.0` - same direction (best match)
/// - `0.0` - orthogonal
/// - `-1.0` - opposite
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}
