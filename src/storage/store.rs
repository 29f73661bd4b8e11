//! Upload and output persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::storage::names::{pdf_name, sanitize_file_name, stored_name, Clock};

/// Collision retries within one millisecond before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free stored name for '{0}'")]
    NamesExhausted(String),
}

/// Flat directory holding uploaded inputs and generated PDFs.
pub struct UploadStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if needed.
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Persist an uploaded document as `{millis}-{sanitized name}`.
    pub async fn save_upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, StorageError> {
        let sanitized = sanitize_file_name(original_name);
        let (name, path) = self.write_unique(&sanitized, bytes).await?;

        tracing::debug!(stored_name = %name, size = bytes.len(), "Upload stored");

        Ok(StoredUpload {
            original_name: original_name.to_string(),
            stored_name: name,
            path,
            size: bytes.len() as u64,
            armed: true,
        })
    }

    /// Persist a rendered PDF for `original_name` as `{millis}-{stem}.pdf`.
    pub async fn save_output(
        &self,
        original_name: &str,
        pdf: &[u8],
    ) -> Result<ConversionResult, StorageError> {
        let name = pdf_name(&sanitize_file_name(original_name));
        let (stored_name, path) = self.write_unique(&name, pdf).await?;

        Ok(ConversionResult {
            stored_name,
            path,
            size: pdf.len() as u64,
        })
    }

    /// Delete a stored file.
    pub async fn remove(&self, path: &Path) -> std::io::Result<()> {
        fs::remove_file(path).await
    }

    async fn write_unique(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<(String, PathBuf), StorageError> {
        let (stored, path, mut file) = self.create_unique(name).await?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(source) = written {
            drop(file);
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
            }
            return Err(StorageError::Write { path, source });
        }

        Ok((stored, path))
    }

    /// Create a new file, inserting a counter when the name is already taken.
    async fn create_unique(&self, name: &str) -> Result<(String, PathBuf, File), StorageError> {
        let millis = self.clock.now_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stored = stored_name(millis, attempt, name);
            let path = self.root.join(&stored);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((stored, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(stored_name = %stored, "Stored name taken, retrying");
                    continue;
                }
                Err(source) => return Err(StorageError::Create { path, source }),
            }
        }

        Err(StorageError::NamesExhausted(name.to_string()))
    }
}

/// An uploaded input on disk.
///
/// The file is deleted when the value is dropped unless [`StoredUpload::keep`] was called.
#[derive(Debug)]
pub struct StoredUpload {
    original_name: String,
    stored_name: String,
    path: PathBuf,
    size: u64,
    armed: bool,
}

impl StoredUpload {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Keep the file on disk and hand back its path.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Delete the file now.
    pub async fn discard(mut self) -> std::io::Result<()> {
        self.armed = false;
        fs::remove_file(&self.path).await
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Only reached when the request is cancelled before cleanup ran, e.g.
        // a client disconnect or the request timeout. The unlink runs inline.
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove upload");
            }
        }
    }
}

/// A rendered PDF written to storage.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::names::FixedClock;

    fn store(dir: &Path, millis: u64) -> UploadStore {
        UploadStore::new(dir, Arc::new(FixedClock(millis)))
    }

    #[tokio::test]
    async fn test_save_upload_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1700000000123);

        let upload = store.save_upload("page.html", b"<h1>hi</h1>").await.unwrap();
        assert_eq!(upload.stored_name(), "1700000000123-page.html");
        assert_eq!(upload.size(), 11);
        assert_eq!(std::fs::read(upload.path()).unwrap(), b"<h1>hi</h1>");
        upload.discard().await.unwrap();
    }

    #[tokio::test]
    async fn test_same_name_same_millisecond_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 42);

        let a = store.save_upload("page.html", b"a").await.unwrap();
        let b = store.save_upload("page.html", b"b").await.unwrap();
        assert_eq!(a.stored_name(), "42-page.html");
        assert_eq!(b.stored_name(), "42-1-page.html");
        assert_eq!(std::fs::read(a.path()).unwrap(), b"a");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_drop_removes_file_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 7);

        let dropped = store.save_upload("a.html", b"a").await.unwrap();
        let dropped_path = dropped.path().to_path_buf();
        drop(dropped);
        assert!(!dropped_path.exists());

        let kept = store.save_upload("b.html", b"b").await.unwrap();
        let kept_path = kept.keep();
        assert!(kept_path.exists());
        assert_eq!(kept_path, dir.path().join("7-b.html"));
    }

    #[tokio::test]
    async fn test_save_output_swaps_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 99);

        let result = store.save_output("Quarterly Report.HTML", b"%PDF-1.7").await.unwrap();
        assert_eq!(result.stored_name, "99-Quarterly_Report.pdf");
        assert_eq!(result.path, dir.path().join("99-Quarterly_Report.pdf"));
        assert_eq!(result.size, 8);
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1);

        let upload = store.save_upload("../../escape.html", b"x").await.unwrap();
        assert_eq!(upload.path().parent(), Some(dir.path()));
        assert_eq!(upload.stored_name(), "1-escape.html");
    }

    #[tokio::test]
    async fn test_missing_root_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir.path().join("absent"), 1);

        let err = store.save_upload("a.html", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::Create { .. }));

        store.ensure_root().await.unwrap();
        assert!(store.save_upload("a.html", b"x").await.is_ok());
    }
}
