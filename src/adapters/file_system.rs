use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;

use crate::ports::file_system::{FileReader, FileSystemError, FileSystemResult, FileWriter};

/// File system adapter over `tokio::fs`.
///
/// A confined adapter resolves relative paths against its root and refuses
/// anything that would land outside it.
#[derive(Debug, Default, Clone)]
pub struct FileSystemAdapter {
    root: Option<PathBuf>,
}

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn confined(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> FileSystemResult<PathBuf> {
        let Some(root) = &self.root else {
            return Ok(path.to_path_buf());
        };

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(FileSystemError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }

        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        if !full_path.starts_with(root) {
            return Err(FileSystemError::InvalidPath(format!(
                "{} is outside {}",
                path.display(),
                root.display()
            )));
        }
        Ok(full_path)
    }

    /// Symlinks can still escape the root; compare canonical forms once the
    /// file exists.
    async fn check_canonical(&self, full_path: &Path) -> FileSystemResult<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let canonical_root = tokio::fs::canonicalize(root).await?;
        let canonical_path = tokio::fs::canonicalize(full_path).await?;
        if !canonical_path.starts_with(&canonical_root) {
            return Err(FileSystemError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FileReader for FileSystemAdapter {
    async fn read_text(&self, path: &Path) -> FileSystemResult<Option<String>> {
        let full_path = self.resolve(path)?;
        match tokio::fs::metadata(&full_path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(FileSystemError::InvalidPath(format!(
                    "{} is not a file",
                    full_path.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FileSystemError::IoError(e)),
        }
        self.check_canonical(&full_path).await?;

        let content = tokio::fs::read_to_string(&full_path).await?;
        Ok(Some(content))
    }
}

#[async_trait]
impl FileWriter for FileSystemAdapter {
    async fn write_text(&self, path: &Path, content: &str) -> FileSystemResult<()> {
        let full_path = self.resolve(path)?;

        // Create parent directories if they don't exist
        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
            self.check_canonical(parent).await?;
        }

        tokio::fs::write(&full_path, content).await?;
        tracing::debug!(path = %full_path.display(), bytes = content.len(), "file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let fs = FileSystemAdapter::new();

        let result = fs
            .read_text(&temp_dir.path().join("robots.txt"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let fs = FileSystemAdapter::new();
        let path = temp_dir.path().join("dist/nested/robots.txt");

        fs.write_text(&path, "User-agent: *\nDisallow: /")
            .await
            .unwrap();

        assert_eq!(
            fs.read_text(&path).await.unwrap().as_deref(),
            Some("User-agent: *\nDisallow: /")
        );
    }

    #[tokio::test]
    async fn test_write_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let fs = FileSystemAdapter::new();
        let path = temp_dir.path().join("robots.txt");

        fs.write_text(&path, "old content that is longer").await.unwrap();
        fs.write_text(&path, "new").await.unwrap();

        assert_eq!(fs.read_text(&path).await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_read_directory_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let fs = FileSystemAdapter::new();

        let result = fs.read_text(temp_dir.path()).await;
        assert!(matches!(result, Err(FileSystemError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_confined_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let fs = FileSystemAdapter::confined(temp_dir.path());

        fs.write_text(Path::new("dist/robots.txt"), "Allow: /")
            .await
            .unwrap();
        assert!(temp_dir.path().join("dist/robots.txt").is_file());
        assert_eq!(
            fs.read_text(Path::new("dist/robots.txt"))
                .await
                .unwrap()
                .as_deref(),
            Some("Allow: /")
        );
    }

    #[tokio::test]
    async fn test_confined_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let fs = FileSystemAdapter::confined(temp_dir.path().join("site"));

        let read = fs.read_text(Path::new("../secret.txt")).await;
        assert!(matches!(read, Err(FileSystemError::InvalidPath(_))));

        let write = fs
            .write_text(&temp_dir.path().join("elsewhere.txt"), "x")
            .await;
        assert!(matches!(write, Err(FileSystemError::InvalidPath(_))));
        assert!(!temp_dir.path().join("elsewhere.txt").exists());
    }
}
