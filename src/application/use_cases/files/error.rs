use std::path::PathBuf;

use crate::application::validation::FieldError;
use crate::domain::files::storage_path::MissingMetadataError;

#[derive(Debug, thiserror::Error)]
pub enum FileServiceError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    MissingMetadata(#[from] MissingMetadataError),
    #[error("Tipo de servicio '{0}' no encontrado.")]
    ServiceTypeNotFound(String),
    #[error("metadatosAdicionales debe ser un string JSON válido.")]
    InvalidMetadataJson(#[source] serde_json::Error),
    #[error("file {0} not found")]
    FileNotFound(i32),
    #[error("file {file_id} has no readable bytes at {}", path.display())]
    PhysicalFileMissing {
        file_id: i32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<Vec<FieldError>> for FileServiceError {
    fn from(errors: Vec<FieldError>) -> Self {
        FileServiceError::Validation(errors)
    }
}
