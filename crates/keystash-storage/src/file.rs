//! File-backed storage: one file per key inside a directory.
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so a crash mid-write leaves the previous value intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::backend::{StorageBackend, validate_key};
use crate::error::{StorageError, StorageResult};

/// Extension appended to every key file.
const FILE_EXTENSION: &str = "json";

/// Persistent storage in a local directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the directory cannot be
    /// created or is not writable.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Connection(format!("cannot create {}: {e}", dir.display()))
        })?;

        let metadata = std::fs::metadata(&dir)
            .map_err(|e| StorageError::Connection(format!("cannot stat {}: {e}", dir.display())))?;
        if metadata.permissions().readonly() {
            return Err(StorageError::Connection(format!(
                "{} is read-only",
                dir.display()
            )));
        }

        info!(path = %dir.display(), "opened file storage");
        Ok(Self { dir })
    }

    /// Directory holding the key files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        if key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(StorageError::InvalidKey(format!(
                "key '{key}' is not a valid file name"
            )));
        }
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "storage file not found");
                Ok(None)
            },
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), bytes = value.len(), "storage file written");
        Ok(())
    }
}
