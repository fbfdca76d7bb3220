//! Assembles a ready-to-ask [`QaChain`] from configuration.
//!
//! The index is built once and reused: when the index directory already
//! exists it is loaded as is, otherwise (or when a rebuild is forced) the
//! speech is loaded, split and embedded from scratch.

use crate::config::{Config, ConfigError};
use crate::provider::Provider;
use crate::qa::{ProviderGenerator, QaChain};
use crate::rag::{
    load_document, ChunkerError, Embedder, LoaderError, RagEngine, RagError, StoreError, TextSplitter,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SetupError {
    /// The speech file is missing; kept apart so callers can point at it.
    #[error("File not found: {}", .0.display())]
    SpeechNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Loader(LoaderError),

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl From<LoaderError> for SetupError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::NotFound(path) => SetupError::SpeechNotFound(path),
            other => SetupError::Loader(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;

#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub speech_file: PathBuf,
    /// Rebuild the index even if one exists.
    pub rebuild: bool,
}

impl SetupOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            speech_file: config.speech_file.clone(),
            rebuild: false,
        }
    }
}

/// How the session's index came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// An existing index was attached.
    Loaded { records: usize },
    /// The index was built from the speech file.
    Built { chunks: usize, records: usize },
}

/// A ready question-answering session.
pub struct Session {
    pub chain: QaChain,
    pub engine: RagEngine,
    pub origin: IndexOrigin,
}

/// Prepares the index and the answer chain.
///
/// Nothing touches the network until an index has to be built or a question
/// is asked; loading an existing index embeds nothing.
///
/// # Errors
///
/// [`SetupError::SpeechNotFound`] when a build is needed and the speech file
/// does not exist. Any other failure (bad configuration, unreadable file,
/// model server or index errors) is reported through the remaining variants.
pub async fn setup(config: &Config, provider: Arc<dyn Provider>, options: &SetupOptions) -> Result<Session> {
    config.validate()?;

    let embedder = Embedder::new(provider.clone(), config.rag.embedding_model.clone());
    let storage = &config.storage;

    let existing = if !options.rebuild && storage.path.exists() {
        info!(path = %storage.path.display(), "Existing vector store found, loading");
        match RagEngine::load(embedder.clone(), storage).await {
            Ok(engine) => Some(engine),
            Err(RagError::Store(StoreError::CollectionNotFound { collection, .. })) => {
                warn!(collection = %collection, "Index directory has no such collection, building it");
                None
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        if options.rebuild {
            info!("Force rebuild requested, recreating vector store");
        } else {
            info!("No existing vector store found, creating a new one");
        }
        None
    };

    let (engine, origin) = match existing {
        Some(engine) => {
            let records = engine.count().await?;
            (engine, IndexOrigin::Loaded { records })
        }
        None => {
            let document = load_document(&options.speech_file).await?;

            let splitter = TextSplitter::new(config.rag.chunk_size, config.rag.chunk_overlap)?
                .with_separator(config.rag.separator.clone());
            let chunks = splitter.split_documents(std::slice::from_ref(&document));
            let chunk_count = chunks.len();
            info!("Split document into {} chunks", chunk_count);

            let engine = RagEngine::build(chunks, embedder, storage).await?;
            let records = engine.count().await?;
            (
                engine,
                IndexOrigin::Built {
                    chunks: chunk_count,
                    records,
                },
            )
        }
    };

    let generator = ProviderGenerator::new(provider, config.llm.model.clone(), config.llm.temperature);
    let chain = QaChain::new(Arc::new(engine.clone()), Arc::new(generator)).with_top_k(config.rag.top_k);

    info!(model = %config.llm.model, top_k = config.rag.top_k, "Question answering ready");
    Ok(Session { chain, engine, origin })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::rag::testing::{embedding_model, HashProvider};
    use std::path::Path;

    const SENTENCE: &str = "The real remedy is to destroy the belief in the sanctity of the shastras.";

    fn config(dir: &Path, speech_file: PathBuf) -> Config {
        let mut config = Config::default();
        config.rag.embedding_model = embedding_model();
        config.storage = StorageConfig {
            path: dir.join("chroma_db"),
            collection_name: "ambedkar_speech".to_string(),
        };
        config.speech_file = speech_file;
        config
    }

    fn write_speech(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("speech.txt");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn long_speech() -> String {
        (0..60)
            .map(|i| format!("Paragraph {} speaks of caste, shastras and social reform.\n", i))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_speech_fails_before_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let config = config(dir.path(), missing.clone());
        let provider = Arc::new(HashProvider::default());

        let result = setup(&config, provider.clone(), &SetupOptions::from_config(&config)).await;

        match result {
            Err(SetupError::SpeechNotFound(path)) => assert_eq!(path, missing),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("setup succeeded without a speech file"),
        }
        assert_eq!(provider.embedded(), 0);
        assert!(!config.storage.path.join("ambedkar_speech.lance").exists());
    }

    #[tokio::test]
    async fn test_single_sentence_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let speech = write_speech(dir.path(), SENTENCE);
        let config = config(dir.path(), speech);
        let provider = Arc::new(HashProvider::answering("Destroy the belief in the shastras."));

        let session = setup(&config, provider, &SetupOptions::from_config(&config)).await.unwrap();
        assert_eq!(session.origin, IndexOrigin::Built { chunks: 1, records: 1 });

        let result = session.chain.ask("What is the real remedy?").await.unwrap();
        assert_eq!(result.retrieved_chunks.len(), 1);
        assert_eq!(result.retrieved_chunks[0].content, SENTENCE);
        assert_eq!(result.answer, "Destroy the belief in the shastras.");
    }

    #[tokio::test]
    async fn test_rebuild_record_count_matches_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let speech = write_speech(dir.path(), &long_speech());
        let config = config(dir.path(), speech.clone());
        let options = SetupOptions {
            speech_file: speech,
            rebuild: true,
        };

        for _ in 0..2 {
            let session = setup(&config, Arc::new(HashProvider::default()), &options).await.unwrap();
            match session.origin {
                IndexOrigin::Built { chunks, records } => {
                    assert!(chunks > 1);
                    assert_eq!(records, chunks);
                }
                other => panic!("expected a build, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_existing_index_is_loaded_without_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let speech = write_speech(dir.path(), &long_speech());
        let config = config(dir.path(), speech);
        let options = SetupOptions::from_config(&config);

        let first = setup(&config, Arc::new(HashProvider::default()), &options).await.unwrap();
        let IndexOrigin::Built { records, .. } = first.origin else {
            panic!("first run should build");
        };

        // The speech file is not needed once the index exists
        std::fs::remove_file(&config.speech_file).unwrap();

        let provider = Arc::new(HashProvider::default());
        let second = setup(&config, provider.clone(), &options).await.unwrap();
        assert_eq!(second.origin, IndexOrigin::Loaded { records });
        assert_eq!(provider.embedded(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), dir.path().join("speech.txt"));
        config.rag.chunk_overlap = config.rag.chunk_size;

        let result = setup(&config, Arc::new(HashProvider::default()), &SetupOptions::from_config(&config)).await;
        assert!(matches!(result, Err(SetupError::Config(_))));
    }
}
