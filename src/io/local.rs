use super::HandleResolver;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads handles that name files on the local filesystem
pub struct LocalFileResolver {
    root: Option<PathBuf>,
}

impl LocalFileResolver {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn path_for(&self, handle: &str) -> PathBuf {
        let path = Path::new(handle.strip_prefix("file://").unwrap_or(handle));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl HandleResolver for LocalFileResolver {
    async fn resolve(&self, handle: &str) -> Result<Vec<u8>> {
        let path = self.path_for(handle);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_absolute_and_file_url_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dog.png");
        std::fs::write(&file, b"png bytes").unwrap();

        let resolver = LocalFileResolver::new(None);
        let absolute = file.to_string_lossy().to_string();
        assert_eq!(resolver.resolve(&absolute).await.unwrap(), b"png bytes");
        assert_eq!(
            resolver
                .resolve(&format!("file://{}", absolute))
                .await
                .unwrap(),
            b"png bytes"
        );
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let resolver = LocalFileResolver::new(Some(PathBuf::from("/nonexistent-root")));
        let err = resolver.resolve("missing.png").await.unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }
}
