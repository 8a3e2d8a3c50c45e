#[derive(Debug, Clone)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub details: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub details: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct ServiceType {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Service types known to the path builder. Anything else is `Other` and
/// only gets the three mandatory path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Maintenance,
    Survey,
    Works,
    Other,
}

impl ServiceKind {
    pub const MAINTENANCE: &'static str = "Mantenimientos";
    pub const SURVEY: &'static str = "Levantamientos";
    pub const WORKS: &'static str = "Obras";

    /// Exact, case-sensitive match on the unsanitized service-type name.
    pub fn from_name(name: &str) -> Self {
        match name {
            Self::MAINTENANCE => ServiceKind::Maintenance,
            Self::SURVEY => ServiceKind::Survey,
            Self::WORKS => ServiceKind::Works,
            _ => ServiceKind::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: i32,
    pub original_filename: String,
    pub stored_filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub client_id: i32,
    pub location_id: i32,
    pub service_type_id: i32,
    pub periodicity: Option<String>,
    pub equipment_name: Option<String>,
    pub task_id: Option<String>,
    pub service_date: Option<chrono::DateTime<chrono::Utc>>,
    pub content_hash: Option<String>,
    pub extra_metadata: Option<serde_json::Value>,
    pub uploaded_by: Option<String>,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct FileWithRelations {
    pub file: StoredFile,
    pub client: Client,
    pub location: Location,
    pub service_type: ServiceType,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub address: Option<String>,
    pub details: Option<String>,
}

/// Insert payload for a file row; id and timestamps are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub original_filename: String,
    pub stored_filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub client_id: i32,
    pub location_id: i32,
    pub service_type_id: i32,
    pub periodicity: Option<String>,
    pub equipment_name: Option<String>,
    pub task_id: Option<String>,
    pub service_date: Option<chrono::DateTime<chrono::Utc>>,
    pub extra_metadata: Option<serde_json::Value>,
    pub uploaded_by: Option<String>,
}
