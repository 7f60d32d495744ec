//! Delivery of finished archives to the user.
//!
//! A [`SaveTarget`] receives each archive exactly once, after assembly
//! has succeeded, together with the suggested file name.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Trait for handing a finished archive to its destination
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Save `archive` under the suggested `file_name`
    async fn save(&self, file_name: &str, archive: Vec<u8>) -> Result<()>;
}

/// Saves archives into a directory.
///
/// The archive is written to `<name>.part` first and renamed into place,
/// so a file under the final name is always complete.
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Final path for a suggested name. Directory components are dropped.
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| anyhow!("invalid archive file name: {:?}", file_name))?;
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl SaveTarget for DirectorySaver {
    async fn save(&self, file_name: &str, archive: Vec<u8>) -> Result<()> {
        let path = self.path_for(file_name)?;
        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir)
                .await
                .with_context(|| format!("failed to create {}", self.dir.display()))?;
        }

        let mut part = path.clone().into_os_string();
        part.push(".part");
        let part = PathBuf::from(part);

        let result = async {
            let mut file = fs::File::create(&part).await?;
            file.write_all(&archive).await?;
            file.sync_all().await?;
            fs::rename(&part, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&part).await;
            return Err(e).with_context(|| format!("failed to write {}", path.display()));
        }

        Ok(())
    }
}

/// Writes archives to stdout
pub struct StdoutSaver;

#[async_trait]
impl SaveTarget for StdoutSaver {
    async fn save(&self, _file_name: &str, archive: Vec<u8>) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&archive).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// An archive kept by [`MemorySaver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Keeps delivered archives in memory.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySaver {
    saved: Arc<Mutex<Vec<SavedArchive>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archives delivered so far, oldest first.
    pub fn saved(&self) -> Vec<SavedArchive> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SaveTarget for MemorySaver {
    async fn save(&self, file_name: &str, archive: Vec<u8>) -> Result<()> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SavedArchive {
                file_name: file_name.to_string(),
                bytes: archive,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_saver_writes_final_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path().join("exports"));

        saver.save("out.zip", b"PK archive".to_vec()).await.unwrap();

        let written = std::fs::read(dir.path().join("exports/out.zip")).unwrap();
        assert_eq!(written, b"PK archive");
        assert!(!dir.path().join("exports/out.zip.part").exists());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_partial_or_final_file() {
        let dir = tempfile::tempdir().unwrap();
        // a directory squatting on the final name makes the rename fail
        std::fs::create_dir(dir.path().join("out.zip")).unwrap();
        let saver = DirectorySaver::new(dir.path());

        let err = saver.save("out.zip", b"PK archive".to_vec()).await.unwrap_err();

        assert!(err.to_string().contains("out.zip"));
        assert!(!dir.path().join("out.zip.part").exists());
        assert!(dir.path().join("out.zip").is_dir());
    }

    #[test]
    fn directory_saver_drops_directory_components() {
        let saver = DirectorySaver::new("/tmp/exports");
        assert_eq!(
            saver.path_for("../../evil.zip").unwrap(),
            PathBuf::from("/tmp/exports/evil.zip")
        );
        assert!(saver.path_for("..").is_err());
    }

    #[tokio::test]
    async fn memory_saver_clones_share_storage() {
        let saver = MemorySaver::new();
        let handle = saver.clone();
        saver.save("a.zip", vec![1, 2]).await.unwrap();

        assert_eq!(
            handle.saved(),
            [SavedArchive {
                file_name: "a.zip".to_string(),
                bytes: vec![1, 2],
            }]
        );
    }
}
