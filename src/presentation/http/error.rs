use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::use_cases::files::FileServiceError;
use crate::application::validation::FieldError;

pub const GENERIC_SERVER_ERROR: &str = "Ocurrió un error en el servidor.";
pub const FILE_NOT_FOUND: &str = "Archivo no encontrado.";
pub const PHYSICAL_FILE_MISSING: &str = "Archivo no encontrado en el almacenamiento físico.";
pub const VALIDATION_FAILED: &str = "Error de validación.";
pub const NO_FILE_PROVIDED: &str = "No se proporcionó ningún archivo.";

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Everything a handler can fail with, rendered as `{message, errors?}`.
#[derive(Debug)]
pub enum ApiError {
    Service(FileServiceError),
    BadRequest(String),
    Multipart(MultipartError),
    Internal(anyhow::Error),
}

impl From<FileServiceError> for ApiError {
    fn from(err: FileServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        ApiError::Service(FileServiceError::Validation(errors))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

fn body(status: StatusCode, message: impl Into<String>, errors: Option<Vec<FieldError>>) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
            errors,
        }),
    )
        .into_response()
}

fn internal(err: &dyn std::fmt::Debug) -> Response {
    tracing::error!(error = ?err, "request_failed");
    body(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_SERVER_ERROR, None)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => body(StatusCode::BAD_REQUEST, message, None),
            ApiError::Multipart(err) => {
                let status = err.status();
                tracing::warn!(error = %err.body_text(), %status, "multipart_rejected");
                body(status, err.body_text(), None)
            }
            ApiError::Internal(err) => internal(&err),
            ApiError::Service(err) => match err {
                FileServiceError::Validation(errors) => {
                    body(StatusCode::BAD_REQUEST, VALIDATION_FAILED, Some(errors))
                }
                FileServiceError::MissingMetadata(missing) => {
                    let errors = missing
                        .missing
                        .iter()
                        .map(|field| FieldError::new(*field, format!("{} es requerido.", field)))
                        .collect();
                    body(StatusCode::BAD_REQUEST, missing.to_string(), Some(errors))
                }
                FileServiceError::InvalidMetadataJson(ref source) => {
                    tracing::debug!(error = %source, "invalid_metadata_json");
                    body(
                        StatusCode::BAD_REQUEST,
                        err.to_string(),
                        Some(vec![FieldError::new("metadatosAdicionales", err.to_string())]),
                    )
                }
                FileServiceError::ServiceTypeNotFound(_) => {
                    body(StatusCode::BAD_REQUEST, err.to_string(), None)
                }
                FileServiceError::FileNotFound(_) => {
                    body(StatusCode::NOT_FOUND, FILE_NOT_FOUND, None)
                }
                FileServiceError::PhysicalFileMissing { .. } => {
                    body(StatusCode::NOT_FOUND, PHYSICAL_FILE_MISSING, None)
                }
                FileServiceError::Unexpected(e) => internal(&e),
            },
        }
    }
}
