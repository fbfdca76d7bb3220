//! Reads the source text file into a [`Document`].

use super::types::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Errors that can occur while loading a document.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Nothing exists at the given path.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read as UTF-8 text.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoaderError>;

/// Loads a UTF-8 text file as a single document.
///
/// The whole file is read into memory. The returned document's metadata has
/// `source` set to `path`.
///
/// # Errors
///
/// - [`LoaderError::NotFound`] if `path` does not exist
/// - [`LoaderError::Io`] if it cannot be read or is not valid UTF-8
pub async fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();

    let exists = fs::try_exists(path).await.map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !exists {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).await.map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), characters = content.chars().count(), "Loaded document");
    Ok(Document::from_source(content, path))
}
