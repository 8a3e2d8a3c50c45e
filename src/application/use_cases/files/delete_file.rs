use std::path::Path;

use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::{RemovalOutcome, StoragePort};
use crate::application::use_cases::files::FileServiceError;

pub const DELETED_MESSAGE: &str = "Archivo eliminado exitosamente.";
pub const DELETED_RECORD_ONLY_MESSAGE: &str =
    "Archivo eliminado de la base de datos. Error al eliminar del sistema de archivos.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The record is gone but the bytes could not be removed.
    RecordOnly,
}

impl DeleteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => DELETED_MESSAGE,
            DeleteOutcome::RecordOnly => DELETED_RECORD_ONLY_MESSAGE,
        }
    }
}

pub struct DeleteFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
}

impl<'a, R, S> DeleteFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(&self, file_id: i32) -> Result<DeleteOutcome, FileServiceError> {
        let Some(record) = self.repo.get_file(file_id).await? else {
            return Err(FileServiceError::FileNotFound(file_id));
        };

        let path = Path::new(&record.storage_path);
        let physical_failed = match self.storage.remove_file(path).await {
            RemovalOutcome::Removed => {
                tracing::info!(file_id, path = %path.display(), "physical_file_removed");
                false
            }
            RemovalOutcome::AlreadyAbsent => {
                tracing::warn!(file_id, path = %path.display(), "physical_file_already_absent");
                false
            }
            RemovalOutcome::Failed(e) => {
                tracing::error!(
                    file_id,
                    path = %path.display(),
                    error = ?e,
                    "physical_file_remove_failed"
                );
                true
            }
        };

        // The record delete is the authoritative signal, so it runs regardless.
        if !self.repo.delete_file(file_id).await? {
            tracing::warn!(file_id, "file_record_vanished_during_delete");
            return Err(FileServiceError::FileNotFound(file_id));
        }
        tracing::info!(file_id, "file_record_deleted");

        Ok(if physical_failed {
            DeleteOutcome::RecordOnly
        } else {
            DeleteOutcome::Deleted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{InMemoryFilesRepository, ScriptedStorage, sample_file};
    use crate::infrastructure::storage::port_impl::FsStoragePort;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    #[tokio::test]
    async fn removes_bytes_and_record() {
        let temp = TempDir::new().unwrap();
        let stored = temp.path().join("a.pdf");
        std::fs::write(&stored, b"x").unwrap();
        let repo = InMemoryFilesRepository::default();
        repo.seed_file(sample_file(1, stored.to_str().unwrap()));
        let storage = FsStoragePort::new(temp.path());
        let uc = DeleteFile {
            repo: &repo,
            storage: &storage,
        };

        let outcome = uc.execute(1).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(outcome.message(), "Archivo eliminado exitosamente.");
        assert!(!stored.exists());
        assert!(repo.files().is_empty());
    }

    #[tokio::test]
    async fn already_absent_bytes_is_plain_success() {
        let repo = InMemoryFilesRepository::default();
        repo.seed_file(sample_file(2, "/nowhere/a.pdf"));
        let storage = ScriptedStorage::removing_with(RemovalOutcome::AlreadyAbsent);
        let uc = DeleteFile {
            repo: &repo,
            storage: &storage,
        };
        assert_eq!(uc.execute(2).await.unwrap(), DeleteOutcome::Deleted);
        assert!(repo.files().is_empty());
    }

    #[tokio::test]
    async fn removal_failure_still_deletes_record() {
        let repo = InMemoryFilesRepository::default();
        repo.seed_file(sample_file(3, "/locked/a.pdf"));
        let storage = ScriptedStorage::removing_with(RemovalOutcome::Failed(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "EACCES"),
        ));
        let uc = DeleteFile {
            repo: &repo,
            storage: &storage,
        };

        let outcome = uc.execute(3).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::RecordOnly);
        assert_eq!(
            outcome.message(),
            "Archivo eliminado de la base de datos. Error al eliminar del sistema de archivos."
        );
        assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 1);
        assert!(repo.files().is_empty());
        assert_eq!(
            storage.removed.lock().unwrap().as_slice(),
            &[std::path::PathBuf::from("/locked/a.pdf")]
        );
    }

    #[tokio::test]
    async fn unknown_id_touches_nothing() {
        let repo = InMemoryFilesRepository::default();
        let storage = ScriptedStorage::removing_with(RemovalOutcome::Removed);
        let uc = DeleteFile {
            repo: &repo,
            storage: &storage,
        };
        let err = uc.execute(77).await.unwrap_err();
        assert!(matches!(err, FileServiceError::FileNotFound(77)));
        assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 0);
        assert!(storage.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_delete_failure_is_unexpected() {
        let repo = InMemoryFilesRepository::default();
        repo.seed_file(sample_file(4, "/x/a.pdf"));
        repo.fail_file_delete.store(true, Ordering::SeqCst);
        let storage = ScriptedStorage::removing_with(RemovalOutcome::Removed);
        let uc = DeleteFile {
            repo: &repo,
            storage: &storage,
        };
        let err = uc.execute(4).await.unwrap_err();
        assert!(matches!(err, FileServiceError::Unexpected(_)));
    }
}
