//! Access to files that can be embedded next to a source document

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("error reading directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A regular file found in a document's directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddableFile {
    pub name: String,
    pub content: String,
}

/// Source of embeddable files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Lists the regular files directly inside `dir`, sorted by name
    async fn list_files(&self, dir: &Path) -> Result<Vec<EmbeddableFile>, FileError>;

    /// Reads a single file as text
    async fn read_file(&self, path: &Path) -> Result<String, FileError>;
}

/// [`FileSource`] backed by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSource;

impl DiskFileSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSource for DiskFileSource {
    async fn list_files(&self, dir: &Path) -> Result<Vec<EmbeddableFile>, FileError> {
        let read_dir_error = |source| FileError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_error)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
            let file_type = entry.file_type().await.map_err(read_dir_error)?;
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            let content = self.read_file(&path).await?;
            files.push(EmbeddableFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                content,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Found {} files in {:?}", files.len(), dir);
        Ok(files)
    }

    async fn read_file(&self, path: &Path) -> Result<String, FileError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FileError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
