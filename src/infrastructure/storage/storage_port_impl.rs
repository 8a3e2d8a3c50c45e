use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs;

use crate::application::ports::storage_port::{FileReader, RemovalOutcome, StoragePort};

/// Local-disk storage rooted at the upload directory.
pub struct FsStoragePort {
    pub uploads_root: PathBuf,
}

impl FsStoragePort {
    pub fn new(uploads_root: impl Into<PathBuf>) -> Self {
        Self {
            uploads_root: uploads_root.into(),
        }
    }

    /// True when `target` names an entry strictly inside the upload root.
    fn contains(&self, target: &Path) -> bool {
        match target.strip_prefix(&self.uploads_root) {
            Ok(rest) => {
                rest.components().next().is_some()
                    && rest.components().all(|c| matches!(c, Component::Normal(_)))
            }
            Err(_) => false,
        }
    }
}

#[async_trait::async_trait]
impl StoragePort for FsStoragePort {
    async fn ensure_dir(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir).await?;
        Ok(())
    }

    async fn place_file(&self, temp_path: &Path, target: &Path) -> anyhow::Result<()> {
        if !self.contains(target) {
            anyhow::bail!(
                "refusing to place {} outside {}",
                target.display(),
                self.uploads_root.display()
            );
        }
        if fs::rename(temp_path, target).await.is_ok() {
            return Ok(());
        }
        // Different filesystem or a vanished temp file; copy surfaces the real error.
        if let Err(e) = fs::copy(temp_path, target).await {
            if let Err(cleanup) = fs::remove_file(target).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(error = ?cleanup, path = %target.display(), "partial_copy_cleanup_failed");
                }
            }
            return Err(e.into());
        }
        if let Err(e) = fs::remove_file(temp_path).await {
            tracing::warn!(error = ?e, path = %temp_path.display(), "temp_upload_cleanup_failed");
        }
        Ok(())
    }

    async fn open_read(&self, path: &Path) -> std::io::Result<FileReader> {
        let file = fs::File::open(path).await?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(std::io::Error::new(ErrorKind::NotFound, "not a regular file"));
        }
        let shown = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |chunk| {
            if let Err(e) = &chunk {
                tracing::error!(error = ?e, path = %shown, "file_stream_aborted");
            }
            chunk
        });
        Ok(FileReader {
            size: Some(meta.len()),
            stream: Box::pin(stream),
        })
    }

    async fn remove_file(&self, path: &Path) -> RemovalOutcome {
        match fs::remove_file(path).await {
            Ok(()) => RemovalOutcome::Removed,
            Err(e) if e.kind() == ErrorKind::NotFound => RemovalOutcome::AlreadyAbsent,
            Err(e) => RemovalOutcome::Failed(e),
        }
    }
}
