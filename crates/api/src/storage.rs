//! On-disk storage of uploaded documents.

use std::path::{Path, PathBuf};

use smartrag_core::error::CoreError;
use smartrag_core::types::FileId;

/// Writes uploads under one directory as `<file id><original extension>`.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
}

/// Where an upload ended up.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Name on disk.
    pub filename: String,
    pub path: PathBuf,
}

impl UploadStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `data` for `id`, creating the directory on first use.
    pub async fn save(
        &self,
        id: FileId,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredUpload, CoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to create upload directory: {e}")))?;

        let filename = format!("{id}{}", extension_of(original_filename));
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to write upload: {e}")))?;

        Ok(StoredUpload { filename, path })
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &str) -> Result<(), CoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Internal(format!("Failed to delete {path}: {e}"))),
        }
    }
}

/// `.ext` of the client's file name, or nothing. Only ASCII alphanumeric
/// extensions are kept so the stored name cannot escape the directory.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
