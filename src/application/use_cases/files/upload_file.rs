use std::path::{Path, PathBuf};

use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::{RemovalOutcome, StoragePort};
use crate::application::use_cases::files::FileServiceError;
use crate::domain::files::file::{Client, Location, NewClient, NewFile, NewLocation, StoredFile};
use crate::domain::files::storage_path::{
    PathMetadata, build_storage_dir, generate_stored_filename,
};

/// A completed upload staged on disk by the request handler.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub temp_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub client_name: Option<String>,
    pub location_name: Option<String>,
    pub service_type_name: Option<String>,
    pub periodicity: Option<String>,
    pub equipment_name: Option<String>,
    pub task_id: Option<String>,
    pub service_date: Option<chrono::DateTime<chrono::Utc>>,
    pub uploaded_by: Option<String>,
    /// Raw JSON text, parsed before any side effect.
    pub extra_metadata: Option<String>,
    pub client_details: Option<String>,
    pub location_address: Option<String>,
    pub location_details: Option<String>,
}

impl UploadMetadata {
    fn path_metadata(&self) -> PathMetadata<'_> {
        PathMetadata {
            client_name: self.client_name.as_deref(),
            location_name: self.location_name.as_deref(),
            service_type_name: self.service_type_name.as_deref(),
            periodicity: self.periodicity.as_deref(),
            equipment_name: self.equipment_name.as_deref(),
            task_id: self.task_id.as_deref(),
        }
    }
}

pub struct UploadFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
    pub uploads_root: &'a Path,
}

impl<'a, R, S> UploadFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(
        &self,
        file: IncomingFile,
        meta: UploadMetadata,
    ) -> Result<StoredFile, FileServiceError> {
        let path_meta = meta.path_metadata();
        path_meta.check_required()?;
        let extra_metadata = match meta.extra_metadata.as_deref() {
            Some(raw) => Some(
                serde_json::from_str::<serde_json::Value>(raw)
                    .map_err(FileServiceError::InvalidMetadataJson)?,
            ),
            None => None,
        };

        let dir = build_storage_dir(self.uploads_root, &path_meta)?;
        self.storage.ensure_dir(&dir).await.map_err(|err| {
            tracing::error!(error = ?err, dir = %dir.display(), "upload_dir_create_failed");
            err
        })?;

        let stored_filename = generate_stored_filename(&file.original_name);
        let target = dir.join(&stored_filename);
        if let Err(err) = self.storage.place_file(&file.temp_path, &target).await {
            tracing::error!(error = ?err, path = %target.display(), "upload_place_failed");
            // A failed copy may have left partial bytes behind.
            self.discard_orphan(&target).await;
            return Err(err.into());
        }

        match self
            .persist(&file, &meta, extra_metadata, stored_filename, &target)
            .await
        {
            Ok(stored) => {
                tracing::info!(
                    file_id = stored.id,
                    path = %stored.storage_path,
                    size = stored.size_bytes,
                    "file_uploaded"
                );
                Ok(stored)
            }
            Err(err) => {
                tracing::error!(error = ?err, path = %target.display(), "upload_persist_failed");
                self.discard_orphan(&target).await;
                Err(err)
            }
        }
    }

    async fn persist(
        &self,
        file: &IncomingFile,
        meta: &UploadMetadata,
        extra_metadata: Option<serde_json::Value>,
        stored_filename: String,
        target: &Path,
    ) -> Result<StoredFile, FileServiceError> {
        let service_type_name = meta.service_type_name.as_deref().unwrap_or_default();
        let service_type = self
            .repo
            .find_service_type_by_name(service_type_name)
            .await?
            .ok_or_else(|| FileServiceError::ServiceTypeNotFound(service_type_name.to_string()))?;
        let client = self.resolve_client(meta).await?;
        let location = self.resolve_location(meta).await?;

        let new_file = NewFile {
            original_filename: file.original_name.clone(),
            stored_filename,
            mime_type: file.mime_type.clone(),
            size_bytes: file.size,
            storage_path: target.to_string_lossy().to_string(),
            client_id: client.id,
            location_id: location.id,
            service_type_id: service_type.id,
            periodicity: meta.periodicity.clone(),
            equipment_name: meta.equipment_name.clone(),
            task_id: meta.task_id.clone(),
            service_date: meta.service_date,
            extra_metadata,
            uploaded_by: meta.uploaded_by.clone(),
        };
        Ok(self.repo.insert_file(&new_file).await?)
    }

    async fn resolve_client(&self, meta: &UploadMetadata) -> anyhow::Result<Client> {
        let name = meta.client_name.clone().unwrap_or_default();
        if let Some(client) = self.repo.find_client_by_name(&name).await? {
            return Ok(client);
        }
        let new_client = NewClient {
            name,
            details: meta.client_details.clone(),
        };
        if let Some(client) = self.repo.insert_client(&new_client).await? {
            tracing::info!(client_id = client.id, name = %client.name, "client_created");
            return Ok(client);
        }
        // Lost the insert race to a concurrent upload.
        self.repo
            .find_client_by_name(&new_client.name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("client '{}' conflicted but is missing", new_client.name))
    }

    async fn resolve_location(&self, meta: &UploadMetadata) -> anyhow::Result<Location> {
        let name = meta.location_name.clone().unwrap_or_default();
        if let Some(location) = self.repo.find_location_by_name(&name).await? {
            return Ok(location);
        }
        let new_location = NewLocation {
            name,
            address: meta.location_address.clone(),
            details: meta.location_details.clone(),
        };
        if let Some(location) = self.repo.insert_location(&new_location).await? {
            tracing::info!(location_id = location.id, name = %location.name, "location_created");
            return Ok(location);
        }
        self.repo
            .find_location_by_name(&new_location.name)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("location '{}' conflicted but is missing", new_location.name)
            })
    }

    async fn discard_orphan(&self, target: &Path) {
        match self.storage.remove_file(target).await {
            RemovalOutcome::Removed | RemovalOutcome::AlreadyAbsent => {
                tracing::info!(path = %target.display(), "upload_orphan_removed");
            }
            RemovalOutcome::Failed(e) => {
                tracing::error!(error = ?e, path = %target.display(), "upload_orphan_cleanup_failed");
            }
        }
    }
}
