use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::path::Path;

pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Debug)]
pub enum RemovalOutcome {
    Removed,
    AlreadyAbsent,
    Failed(std::io::Error),
}

pub struct FileReader {
    pub size: Option<u64>,
    pub stream: ByteStream,
}

#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Creates `dir` and its parents; an existing directory is success.
    async fn ensure_dir(&self, dir: &Path) -> anyhow::Result<()>;
    /// Moves a completed temporary upload to its final location.
    async fn place_file(&self, temp_path: &Path, target: &Path) -> anyhow::Result<()>;
    /// Opens a stored file for streaming; any error means the bytes are not accessible.
    async fn open_read(&self, path: &Path) -> std::io::Result<FileReader>;
    async fn remove_file(&self, path: &Path) -> RemovalOutcome;
}
