use std::path::PathBuf;

use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::{FileReader, StoragePort};
use crate::application::use_cases::files::FileServiceError;

pub struct FileDownload {
    /// Name offered to the client: always the original upload name.
    pub filename: String,
    pub mime_type: String,
    pub reader: FileReader,
}

pub struct DownloadFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
}

impl<'a, R, S> DownloadFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(&self, file_id: i32) -> Result<FileDownload, FileServiceError> {
        let Some(record) = self.repo.get_file(file_id).await? else {
            tracing::warn!(file_id, "download_record_not_found");
            return Err(FileServiceError::FileNotFound(file_id));
        };

        let path = PathBuf::from(&record.storage_path);
        let reader = match self.storage.open_read(&path).await {
            Ok(reader) => reader,
            Err(source) => {
                // Record present but bytes gone: DB and disk have drifted.
                tracing::error!(
                    file_id,
                    path = %path.display(),
                    error = ?source,
                    "physical_file_missing"
                );
                return Err(FileServiceError::PhysicalFileMissing {
                    file_id,
                    path,
                    source,
                });
            }
        };

        Ok(FileDownload {
            filename: record.original_filename,
            mime_type: record.mime_type,
            reader,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{InMemoryFilesRepository, sample_file};
    use crate::infrastructure::storage::port_impl::FsStoragePort;
    use futures_util::StreamExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unknown_id_is_file_not_found() {
        let temp = TempDir::new().unwrap();
        let repo = InMemoryFilesRepository::default();
        let storage = FsStoragePort::new(temp.path());
        let uc = DownloadFile {
            repo: &repo,
            storage: &storage,
        };
        let err = uc.execute(9).await.err().unwrap();
        assert!(matches!(err, FileServiceError::FileNotFound(9)));
    }

    #[tokio::test]
    async fn missing_bytes_is_physical_file_missing() {
        let temp = TempDir::new().unwrap();
        let repo = InMemoryFilesRepository::default();
        let gone = temp.path().join("gone.pdf");
        repo.seed_file(sample_file(3, gone.to_str().unwrap()));
        let storage = FsStoragePort::new(temp.path());
        let uc = DownloadFile {
            repo: &repo,
            storage: &storage,
        };
        let err = uc.execute(3).await.err().unwrap();
        match err {
            FileServiceError::PhysicalFileMissing { file_id, path, .. } => {
                assert_eq!(file_id, 3);
                assert_eq!(path, gone);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn streams_bytes_with_original_name() {
        let temp = TempDir::new().unwrap();
        let repo = InMemoryFilesRepository::default();
        let stored = temp.path().join("informe_x.pdf");
        std::fs::write(&stored, b"data").unwrap();
        repo.seed_file(sample_file(5, stored.to_str().unwrap()));
        let storage = FsStoragePort::new(temp.path());
        let uc = DownloadFile {
            repo: &repo,
            storage: &storage,
        };

        let download = uc.execute(5).await.ok().unwrap();
        assert_eq!(download.filename, "informe.pdf");
        assert_eq!(download.mime_type, "application/pdf");
        assert_eq!(download.reader.size, Some(4));
        let body: Vec<u8> = download
            .reader
            .stream
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect();
        assert_eq!(body, b"data");
    }
}
