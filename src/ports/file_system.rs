use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for file system operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when path is invalid
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// FileReader defines the port for reading the optional static rules file
#[async_trait]
pub trait FileReader: Send + Sync + 'static {
    /// Read a UTF-8 text file.
    ///
    /// # Returns
    /// `Ok(None)` when the file does not exist, which is not an error.
    async fn read_text(&self, path: &Path) -> FileSystemResult<Option<String>>;
}

/// FileWriter defines the port for emitting the generated document
#[async_trait]
pub trait FileWriter: Send + Sync + 'static {
    /// Write `content` to `path`, creating parent directories as needed and
    /// replacing any existing file.
    async fn write_text(&self, path: &Path, content: &str) -> FileSystemResult<()>;
}
