//! Local filesystem storage backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use placebook_shared::{PlacebookError, Result};

use crate::CatalogStore;

/// Filesystem-backed store rooted at a directory. Keys map to relative
/// paths beneath the root.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl CatalogStore for LocalStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PlacebookError::io(parent, e))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| PlacebookError::Persistence(format!("write {}: {e}", path.display())))?;

        debug!(key, bytes = data.len(), "local store upload");
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PlacebookError::Persistence(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).exists())
    }
}

impl LocalStore {
    /// Expand a leading `~` against the user's home directory.
    pub fn expand_root(root: &str) -> PathBuf {
        if let Some(rest) = root.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        Path::new(root).to_path_buf()
    }
}
