use crate::models::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole question-answering pipeline.
///
/// Every section has defaults, so a YAML file only needs the keys it wants
/// to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub storage: StorageConfig,
    /// Text file the index is built from
    pub speech_file: PathBuf,
}

/// Configuration for the answering model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "mistral".to_string(),
            base_url: "http://localhost:11434".to_string(),
            // Low temperature keeps answers close to the retrieved text
            temperature: 0.2,
        }
    }
}

/// Configuration for RAG processing.
///
/// This covers the embedding model, text chunking and retrieval depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub embedding_model: EmbeddingModel,
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
    /// Literal string the text is split on before chunks are packed
    pub separator: String,
    /// Number of chunks handed to the model per question
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: EmbeddingModel::default(),
            chunk_size: 500,
            chunk_overlap: 50,
            separator: "\n".to_string(),
            top_k: 3,
        }
    }
}

/// Where the vector index lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the index
    pub path: PathBuf,
    /// Collection (table) name inside the index directory
    pub collection_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./chroma_db"),
            collection_name: "ambedkar_speech".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            storage: StorageConfig::default(),
            speech_file: PathBuf::from("data/speech.txt"),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, otherwise use defaults.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Checks the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(ConfigError::Invalid("rag.chunk_size must be positive".into()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be positive".into()));
        }
        if rag.embedding_model.embedding_dim == 0 {
            return Err(ConfigError::Invalid(
                "rag.embedding_model.embedding_dim must be positive".into(),
            ));
        }
        if self.storage.collection_name.is_empty() {
            return Err(ConfigError::Invalid("storage.collection_name is empty".into()));
        }
        Ok(())
    }
}
