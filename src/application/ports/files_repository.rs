use async_trait::async_trait;

use crate::domain::files::file::{
    Client, FileWithRelations, Location, NewClient, NewFile, NewLocation, ServiceType, StoredFile,
};

/// Matches an associated entity either by primary key or by exact business name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Id(i32),
    Name(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileFilter {
    pub client: Option<EntityRef>,
    pub location: Option<EntityRef>,
    pub service_type: Option<EntityRef>,
    /// Half-open `[from, to)` window on the service-performed timestamp.
    pub service_date: Option<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    OriginalFilename,
    MimeType,
    SizeBytes,
    ServiceDate,
    #[default]
    UploadDate,
    UpdatedAt,
}

impl SortField {
    /// Accepts the column names used on the wire and their camel-case aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(SortField::Id),
            "nombre_original_archivo" | "originalFilename" => Some(SortField::OriginalFilename),
            "mime_type" | "mimeType" => Some(SortField::MimeType),
            "tamano_bytes" | "byteSize" => Some(SortField::SizeBytes),
            "fecha_realizacion_servicio" | "serviceDate" => Some(SortField::ServiceDate),
            "fecha_subida" | "uploadDate" => Some(SortField::UploadDate),
            "updated_at" | "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::OriginalFilename => "nombre_original_archivo",
            SortField::MimeType => "mime_type",
            SortField::SizeBytes => "tamano_bytes",
            SortField::ServiceDate => "fecha_realizacion_servicio",
            SortField::UploadDate => "fecha_subida",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileListQuery {
    pub filter: FileFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub skip: i64,
    pub take: i64,
}

#[async_trait]
pub trait FilesRepository: Send + Sync {
    async fn find_client_by_name(&self, name: &str) -> anyhow::Result<Option<Client>>;
    /// Returns `None` when a client with the same name already exists.
    async fn insert_client(&self, client: &NewClient) -> anyhow::Result<Option<Client>>;

    async fn find_location_by_name(&self, name: &str) -> anyhow::Result<Option<Location>>;
    /// Returns `None` when a location with the same name already exists.
    async fn insert_location(&self, location: &NewLocation) -> anyhow::Result<Option<Location>>;

    async fn find_service_type_by_name(&self, name: &str) -> anyhow::Result<Option<ServiceType>>;

    async fn insert_file(&self, file: &NewFile) -> anyhow::Result<StoredFile>;
    async fn get_file(&self, file_id: i32) -> anyhow::Result<Option<StoredFile>>;
    /// Returns whether a row was removed.
    async fn delete_file(&self, file_id: i32) -> anyhow::Result<bool>;

    async fn list_files(&self, query: &FileListQuery) -> anyhow::Result<Vec<FileWithRelations>>;
    async fn count_files(&self, filter: &FileFilter) -> anyhow::Result<i64>;
}
