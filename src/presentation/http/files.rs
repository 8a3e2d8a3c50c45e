use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use utoipa::{IntoParams, ToSchema};

use crate::application::use_cases::files::delete_file::DeleteFile;
use crate::application::use_cases::files::download_file::DownloadFile;
use crate::application::use_cases::files::list_files::{ListFiles, ListFilesRequest, Pagination};
use crate::application::use_cases::files::upload_file::{IncomingFile, UploadFile, UploadMetadata};
use crate::application::validation::{Violations, parse_file_id};
use crate::bootstrap::app_context::AppContext;
use crate::domain::files::file::{
    Client, FileWithRelations, Location, ServiceType, StoredFile,
};
use crate::presentation::http::error::{ApiError, ErrorResponse, NO_FILE_PROVIDED};

pub const UPLOADED_MESSAGE: &str = "Archivo subido exitosamente.";
const SERVICE_DATE_FIELD: &str = "fechaRealizacionServicio";

#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: i32,
    pub nombre_original_archivo: String,
    pub nombre_archivo_almacenado: String,
    pub mime_type: String,
    pub tamano_bytes: i64,
    pub ruta_almacenamiento_fisico: String,
    pub cliente_id: i32,
    pub lugar_id: i32,
    pub tipo_servicio_id: i32,
    pub periodicidad: Option<String>,
    pub nombre_equipo: Option<String>,
    pub identificador_tarea: Option<String>,
    pub fecha_realizacion_servicio: Option<chrono::DateTime<chrono::Utc>>,
    pub hash_contenido: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadatos_adicionales: Option<serde_json::Value>,
    pub subido_por_usuario_id: Option<String>,
    pub fecha_subida: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<StoredFile> for FileResponse {
    fn from(f: StoredFile) -> Self {
        Self {
            id: f.id,
            nombre_original_archivo: f.original_filename,
            nombre_archivo_almacenado: f.stored_filename,
            mime_type: f.mime_type,
            tamano_bytes: f.size_bytes,
            ruta_almacenamiento_fisico: f.storage_path,
            cliente_id: f.client_id,
            lugar_id: f.location_id,
            tipo_servicio_id: f.service_type_id,
            periodicidad: f.periodicity,
            nombre_equipo: f.equipment_name,
            identificador_tarea: f.task_id,
            fecha_realizacion_servicio: f.service_date,
            hash_contenido: f.content_hash,
            metadatos_adicionales: f.extra_metadata,
            subido_por_usuario_id: f.uploaded_by,
            fecha_subida: f.uploaded_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientItem {
    pub id: i32,
    pub nombre_cliente: String,
    pub detalles: Option<String>,
}

impl From<Client> for ClientItem {
    fn from(c: Client) -> Self {
        Self {
            id: c.id,
            nombre_cliente: c.name,
            detalles: c.details,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationItem {
    pub id: i32,
    pub nombre_lugar: String,
    pub direccion: Option<String>,
    pub detalles: Option<String>,
}

impl From<Location> for LocationItem {
    fn from(l: Location) -> Self {
        Self {
            id: l.id,
            nombre_lugar: l.name,
            direccion: l.address,
            detalles: l.details,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceTypeItem {
    pub id: i32,
    pub nombre_tipo_servicio: String,
    pub descripcion: Option<String>,
}

impl From<ServiceType> for ServiceTypeItem {
    fn from(t: ServiceType) -> Self {
        Self {
            id: t.id,
            nombre_tipo_servicio: t.name,
            descripcion: t.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListItem {
    #[serde(flatten)]
    pub file: FileResponse,
    pub cliente: ClientItem,
    pub lugar: LocationItem,
    pub tipo_servicio: ServiceTypeItem,
}

impl From<FileWithRelations> for FileListItem {
    fn from(r: FileWithRelations) -> Self {
        Self {
            file: r.file.into(),
            cliente: r.client.into(),
            lugar: r.location.into(),
            tipo_servicio: r.service_type.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub items_per_page: i64,
}

impl From<Pagination> for PaginationResponse {
    fn from(p: Pagination) -> Self {
        Self {
            total_items: p.total_items,
            total_pages: p.total_pages,
            current_page: p.current_page,
            items_per_page: p.items_per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub data: Vec<FileListItem>,
    pub pagination: PaginationResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadFileResponse {
    pub message: String,
    pub file: FileResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFileResponse {
    pub message: String,
    #[serde(rename = "fileId")]
    pub file_id: i32,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadFileMultipart {
    /// File to upload
    #[schema(value_type = String, format = Binary)]
    file: String,
    #[schema(rename = "clienteNombre")]
    cliente_nombre: String,
    #[schema(rename = "lugarNombre")]
    lugar_nombre: String,
    /// Mantenimientos, Levantamientos, Obras or any other seeded type
    #[schema(rename = "tipoServicioNombre")]
    tipo_servicio_nombre: String,
    periodicidad: Option<String>,
    #[schema(rename = "nombreEquipo")]
    nombre_equipo: Option<String>,
    #[schema(rename = "identificadorTarea")]
    identificador_tarea: Option<String>,
    /// ISO 8601 date or date-time
    #[schema(rename = "fechaRealizacionServicio")]
    fecha_realizacion_servicio: Option<String>,
    #[schema(rename = "subidoPorUsuarioId")]
    subido_por_usuario_id: Option<String>,
    /// JSON text
    #[schema(rename = "metadatosAdicionales")]
    metadatos_adicionales: Option<String>,
    #[schema(rename = "clienteDetalles")]
    cliente_detalles: Option<String>,
    #[schema(rename = "lugarDireccion")]
    lugar_direccion: Option<String>,
    #[schema(rename = "lugarDetalles")]
    lugar_detalles: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    pub cliente_id: Option<String>,
    #[serde(rename = "clienteNombre")]
    pub cliente_nombre: Option<String>,
    pub lugar_id: Option<String>,
    #[serde(rename = "lugarNombre")]
    pub lugar_nombre: Option<String>,
    pub tipo_servicio_id: Option<String>,
    #[serde(rename = "tipoServicioNombre")]
    pub tipo_servicio_nombre: Option<String>,
    /// Matches the whole UTC calendar day of the given date
    #[serde(rename = "fechaRealizacionServicio")]
    pub fecha_realizacion_servicio: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

impl From<ListFilesQuery> for ListFilesRequest {
    fn from(q: ListFilesQuery) -> Self {
        Self {
            client_id: q.cliente_id,
            client_name: q.cliente_nombre,
            location_id: q.lugar_id,
            location_name: q.lugar_nombre,
            service_type_id: q.tipo_servicio_id,
            service_type_name: q.tipo_servicio_nombre,
            service_date: q.fecha_realizacion_servicio,
            page: q.page,
            limit: q.limit,
            sort_by: q.sort_by,
            sort_order: q.sort_order,
        }
    }
}

/// Text parts of the upload form, trimmed; blank values count as absent.
#[derive(Debug, Default)]
struct UploadForm {
    client_name: Option<String>,
    location_name: Option<String>,
    service_type_name: Option<String>,
    periodicity: Option<String>,
    equipment_name: Option<String>,
    task_id: Option<String>,
    service_date: Option<String>,
    uploaded_by: Option<String>,
    extra_metadata: Option<String>,
    client_details: Option<String>,
    location_address: Option<String>,
    location_details: Option<String>,
}

impl UploadForm {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "clienteNombre" => &mut self.client_name,
            "lugarNombre" => &mut self.location_name,
            "tipoServicioNombre" => &mut self.service_type_name,
            "periodicidad" => &mut self.periodicity,
            "nombreEquipo" => &mut self.equipment_name,
            "identificadorTarea" => &mut self.task_id,
            SERVICE_DATE_FIELD => &mut self.service_date,
            "subidoPorUsuarioId" => &mut self.uploaded_by,
            "metadatosAdicionales" => &mut self.extra_metadata,
            "clienteDetalles" => &mut self.client_details,
            "lugarDireccion" => &mut self.location_address,
            "lugarDetalles" => &mut self.location_details,
            _ => return None,
        })
    }

    fn into_metadata(self) -> Result<UploadMetadata, ApiError> {
        let mut v = Violations::default();
        let service_date = v.iso8601(SERVICE_DATE_FIELD, self.service_date.as_deref());
        v.into_result()?;
        Ok(UploadMetadata {
            client_name: self.client_name,
            location_name: self.location_name,
            service_type_name: self.service_type_name,
            periodicity: self.periodicity,
            equipment_name: self.equipment_name,
            task_id: self.task_id,
            service_date,
            uploaded_by: self.uploaded_by,
            extra_metadata: self.extra_metadata,
            client_details: self.client_details,
            location_address: self.location_address,
            location_details: self.location_details,
        })
    }
}

/// Upload staged on disk; the guard deletes the temp file unless it was moved.
struct StagedUpload {
    original_name: String,
    mime_type: String,
    size: i64,
    temp: tempfile::TempPath,
}

async fn stage_file_part(
    ctx: &AppContext,
    mut field: axum::extract::multipart::Field<'_>,
) -> Result<StagedUpload, ApiError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = match field.content_type() {
        Some(ct) if !ct.trim().is_empty() => ct.to_string(),
        _ => mime_guess::from_path(&original_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };

    let named = tempfile::Builder::new()
        .prefix(".upload-")
        .tempfile_in(ctx.uploads_root())?;
    let (std_file, temp) = named.into_parts();
    let mut out = tokio::fs::File::from_std(std_file);
    let mut size: i64 = 0;
    while let Some(chunk) = field.chunk().await? {
        out.write_all(&chunk).await?;
        size += chunk.len() as i64;
    }
    out.flush().await?;
    drop(out);

    tracing::debug!(
        original_name = %original_name,
        %mime_type,
        size,
        temp = %temp.display(),
        "upload_staged"
    );
    Ok(StagedUpload {
        original_name,
        mime_type,
        size,
        temp,
    })
}

/// POST /api/v1/files/upload (multipart/form-data)
#[utoipa::path(
    post,
    path = "/api/v1/files/upload",
    tag = "Files",
    request_body(
        content = UploadFileMultipart,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "File uploaded", body = UploadFileResponse),
        (status = 400, description = "Missing file, missing metadata or invalid metadata", body = ErrorResponse),
        (status = 413, description = "Upload too large"),
        (status = 500, description = "Unexpected error", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadFileResponse>), ApiError> {
    let mut form = UploadForm::default();
    let mut staged: Option<StagedUpload> = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            if staged.is_some() {
                return Err(ApiError::BadRequest(
                    "Solo se permite un archivo por solicitud.".into(),
                ));
            }
            staged = Some(stage_file_part(&ctx, field).await?);
            continue;
        }
        let Some(slot) = form.slot(&name) else {
            continue;
        };
        let text = field.text().await?;
        let trimmed = text.trim();
        *slot = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    let meta = form.into_metadata()?;
    let Some(staged) = staged else {
        return Err(ApiError::BadRequest(NO_FILE_PROVIDED.into()));
    };

    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    let uc = UploadFile {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
        uploads_root: ctx.uploads_root(),
    };
    let incoming = IncomingFile {
        original_name: staged.original_name,
        mime_type: staged.mime_type,
        size: staged.size,
        temp_path: staged.temp.to_path_buf(),
    };
    let stored = uc.execute(incoming, meta).await?;
    // Dropping the guard after a successful move is a no-op.
    drop(staged.temp);
    Ok((
        StatusCode::CREATED,
        Json(UploadFileResponse {
            message: UPLOADED_MESSAGE.to_string(),
            file: stored.into(),
        }),
    ))
}

/// Builds `attachment; filename="..."; filename*=UTF-8''...` for an arbitrary name.
pub fn content_disposition(filename: &str) -> String {
    let mut ascii = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                ascii.push('\\');
                ascii.push(c);
            }
            c if c.is_ascii_control() || !c.is_ascii() => ascii.push('_'),
            c => ascii.push(c),
        }
    }
    let mut encoded = String::with_capacity(filename.len() * 3);
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii, encoded
    )
}

/// GET /api/v1/files/download/{fileId} -> bytes
#[utoipa::path(
    get,
    path = "/api/v1/files/download/{fileId}",
    tag = "Files",
    params(("fileId" = i32, Path, description = "File ID")),
    responses(
        (status = 200, description = "File bytes", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "Record or physical file missing", body = ErrorResponse)
    )
)]
pub async fn download_file(
    State(ctx): State<AppContext>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let file_id = parse_file_id(&raw_id)?;
    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    let uc = DownloadFile {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
    };
    let download = uc.execute(file_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&download.mime_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    if let Ok(v) = HeaderValue::from_str(&content_disposition(&download.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    if let Some(size) = download.reader.size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    tracing::info!(file_id, "file_download_started");
    Ok((headers, Body::from_stream(download.reader.stream)).into_response())
}

/// GET /api/v1/files
#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "Files",
    params(ListFilesQuery),
    responses(
        (status = 200, body = FileListResponse),
        (status = 400, description = "Invalid filter or pagination values", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(ctx): State<AppContext>,
    q: Option<Query<ListFilesQuery>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let req: ListFilesRequest = q.map(|Query(v)| v).unwrap_or_default().into();
    let repo = ctx.files_repo();
    let uc = ListFiles {
        repo: repo.as_ref(),
    };
    let page = uc.execute(&req).await?;
    Ok(Json(FileListResponse {
        data: page.items.into_iter().map(Into::into).collect(),
        pagination: page.pagination.into(),
    }))
}

/// DELETE /api/v1/files/{fileId}
#[utoipa::path(
    delete,
    path = "/api/v1/files/{fileId}",
    tag = "Files",
    params(("fileId" = i32, Path, description = "File ID")),
    responses(
        (status = 200, body = DeleteFileResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(ctx): State<AppContext>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Json<DeleteFileResponse>, ApiError> {
    let file_id = parse_file_id(&raw_id)?;
    let repo = ctx.files_repo();
    let storage = ctx.storage_port();
    let uc = DeleteFile {
        repo: repo.as_ref(),
        storage: storage.as_ref(),
    };
    let outcome = uc.execute(file_id).await?;
    Ok(Json(DeleteFileResponse {
        message: outcome.message().to_string(),
        file_id,
    }))
}

pub fn routes(ctx: AppContext) -> Router {
    let body_limit = ctx.cfg.upload_max_bytes;
    Router::new()
        .route(
            "/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(list_files))
        .route("/files/download/:fileId", get(download_file))
        .route("/files/:fileId", axum::routing::delete(delete_file))
        .with_state(ctx)
}
