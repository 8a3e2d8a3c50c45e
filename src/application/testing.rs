//! Test doubles for the file ports.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::application::ports::files_repository::{
    EntityRef, FileFilter, FileListQuery, FilesRepository, SortField, SortOrder,
};
use crate::application::ports::storage_port::{FileReader, RemovalOutcome, StoragePort};
use crate::domain::files::file::{
    Client, FileWithRelations, Location, NewClient, NewFile, NewLocation, ServiceType, StoredFile,
};

#[derive(Default)]
struct State {
    clients: Vec<Client>,
    locations: Vec<Location>,
    service_types: Vec<ServiceType>,
    files: Vec<StoredFile>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryFilesRepository {
    state: Mutex<State>,
    /// Makes the next client insert behave as if a concurrent request created it first.
    pub race_next_client_insert: AtomicBool,
    pub fail_file_insert: AtomicBool,
    pub fail_file_delete: AtomicBool,
    pub delete_calls: AtomicUsize,
    pub client_inserts: AtomicUsize,
    pub last_list_query: Mutex<Option<FileListQuery>>,
    pub last_count_filter: Mutex<Option<FileFilter>>,
}

impl InMemoryFilesRepository {
    pub fn with_default_service_types() -> Self {
        let repo = Self::default();
        for name in ["Mantenimientos", "Levantamientos", "Obras"] {
            repo.add_service_type(name);
        }
        repo
    }

    pub fn add_service_type(&self, name: &str) -> ServiceType {
        let mut s = self.state.lock().unwrap();
        let now = Utc::now();
        let st = ServiceType {
            id: s.next_id(),
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        s.service_types.push(st.clone());
        st
    }

    pub fn clients(&self) -> Vec<Client> {
        self.state.lock().unwrap().clients.clone()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.state.lock().unwrap().locations.clone()
    }

    pub fn files(&self) -> Vec<StoredFile> {
        self.state.lock().unwrap().files.clone()
    }

    pub fn seed_file(&self, file: StoredFile) {
        self.state.lock().unwrap().files.push(file);
    }

    fn push_client(s: &mut State, client: &NewClient) -> Client {
        let now = Utc::now();
        let c = Client {
            id: s.next_id(),
            name: client.name.clone(),
            details: client.details.clone(),
            created_at: now,
            updated_at: now,
        };
        s.clients.push(c.clone());
        c
    }

    fn matches(s: &State, f: &StoredFile, filter: &FileFilter) -> bool {
        let client_ok = match &filter.client {
            None => true,
            Some(EntityRef::Id(id)) => f.client_id == *id,
            Some(EntityRef::Name(n)) => s.clients.iter().any(|c| c.id == f.client_id && &c.name == n),
        };
        let location_ok = match &filter.location {
            None => true,
            Some(EntityRef::Id(id)) => f.location_id == *id,
            Some(EntityRef::Name(n)) => s
                .locations
                .iter()
                .any(|l| l.id == f.location_id && &l.name == n),
        };
        let service_ok = match &filter.service_type {
            None => true,
            Some(EntityRef::Id(id)) => f.service_type_id == *id,
            Some(EntityRef::Name(n)) => s
                .service_types
                .iter()
                .any(|t| t.id == f.service_type_id && &t.name == n),
        };
        let date_ok = match filter.service_date {
            None => true,
            Some((from, to)) => f.service_date.is_some_and(|d| d >= from && d < to),
        };
        client_ok && location_ok && service_ok && date_ok
    }

    fn relations(s: &State, f: &StoredFile) -> Option<FileWithRelations> {
        Some(FileWithRelations {
            file: f.clone(),
            client: s.clients.iter().find(|c| c.id == f.client_id)?.clone(),
            location: s.locations.iter().find(|l| l.id == f.location_id)?.clone(),
            service_type: s
                .service_types
                .iter()
                .find(|t| t.id == f.service_type_id)?
                .clone(),
        })
    }
}

#[async_trait]
impl FilesRepository for InMemoryFilesRepository {
    async fn find_client_by_name(&self, name: &str) -> anyhow::Result<Option<Client>> {
        let s = self.state.lock().unwrap();
        Ok(s.clients.iter().find(|c| c.name == name).cloned())
    }

    async fn insert_client(&self, client: &NewClient) -> anyhow::Result<Option<Client>> {
        self.client_inserts.fetch_add(1, Ordering::SeqCst);
        let mut s = self.state.lock().unwrap();
        if self.race_next_client_insert.swap(false, Ordering::SeqCst) {
            Self::push_client(&mut s, client);
            return Ok(None);
        }
        if s.clients.iter().any(|c| c.name == client.name) {
            return Ok(None);
        }
        Ok(Some(Self::push_client(&mut s, client)))
    }

    async fn find_location_by_name(&self, name: &str) -> anyhow::Result<Option<Location>> {
        let s = self.state.lock().unwrap();
        Ok(s.locations.iter().find(|l| l.name == name).cloned())
    }

    async fn insert_location(&self, location: &NewLocation) -> anyhow::Result<Option<Location>> {
        let mut s = self.state.lock().unwrap();
        if s.locations.iter().any(|l| l.name == location.name) {
            return Ok(None);
        }
        let now = Utc::now();
        let l = Location {
            id: s.next_id(),
            name: location.name.clone(),
            address: location.address.clone(),
            details: location.details.clone(),
            created_at: now,
            updated_at: now,
        };
        s.locations.push(l.clone());
        Ok(Some(l))
    }

    async fn find_service_type_by_name(&self, name: &str) -> anyhow::Result<Option<ServiceType>> {
        let s = self.state.lock().unwrap();
        Ok(s.service_types.iter().find(|t| t.name == name).cloned())
    }

    async fn insert_file(&self, file: &NewFile) -> anyhow::Result<StoredFile> {
        if self.fail_file_insert.load(Ordering::SeqCst) {
            anyhow::bail!("insert_file failed");
        }
        let mut s = self.state.lock().unwrap();
        let now = Utc::now();
        let stored = StoredFile {
            id: s.next_id(),
            original_filename: file.original_filename.clone(),
            stored_filename: file.stored_filename.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size_bytes,
            storage_path: file.storage_path.clone(),
            client_id: file.client_id,
            location_id: file.location_id,
            service_type_id: file.service_type_id,
            periodicity: file.periodicity.clone(),
            equipment_name: file.equipment_name.clone(),
            task_id: file.task_id.clone(),
            service_date: file.service_date,
            content_hash: None,
            extra_metadata: file.extra_metadata.clone(),
            uploaded_by: file.uploaded_by.clone(),
            uploaded_at: now,
            updated_at: now,
        };
        s.files.push(stored.clone());
        Ok(stored)
    }

    async fn get_file(&self, file_id: i32) -> anyhow::Result<Option<StoredFile>> {
        let s = self.state.lock().unwrap();
        Ok(s.files.iter().find(|f| f.id == file_id).cloned())
    }

    async fn delete_file(&self, file_id: i32) -> anyhow::Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_file_delete.load(Ordering::SeqCst) {
            anyhow::bail!("delete_file failed");
        }
        let mut s = self.state.lock().unwrap();
        let before = s.files.len();
        s.files.retain(|f| f.id != file_id);
        Ok(s.files.len() < before)
    }

    async fn list_files(&self, query: &FileListQuery) -> anyhow::Result<Vec<FileWithRelations>> {
        *self.last_list_query.lock().unwrap() = Some(query.clone());
        let s = self.state.lock().unwrap();
        let mut rows: Vec<&StoredFile> = s
            .files
            .iter()
            .filter(|f| Self::matches(&s, f, &query.filter))
            .collect();
        rows.sort_by(|a, b| {
            let ord = match query.sort_by {
                SortField::Id => a.id.cmp(&b.id),
                SortField::OriginalFilename => a.original_filename.cmp(&b.original_filename),
                SortField::MimeType => a.mime_type.cmp(&b.mime_type),
                SortField::SizeBytes => a.size_bytes.cmp(&b.size_bytes),
                SortField::ServiceDate => a.service_date.cmp(&b.service_date),
                SortField::UploadDate => a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        Ok(rows
            .into_iter()
            .skip(query.skip as usize)
            .take(query.take as usize)
            .filter_map(|f| Self::relations(&s, f))
            .collect())
    }

    async fn count_files(&self, filter: &FileFilter) -> anyhow::Result<i64> {
        *self.last_count_filter.lock().unwrap() = Some(filter.clone());
        let s = self.state.lock().unwrap();
        Ok(s.files
            .iter()
            .filter(|f| Self::matches(&s, f, filter))
            .count() as i64)
    }
}

/// Storage double whose removal result is scripted; other operations fail.
pub struct ScriptedStorage {
    pub removal: Mutex<Option<RemovalOutcome>>,
    pub removed: Mutex<Vec<PathBuf>>,
    dirs_ok: bool,
}

impl ScriptedStorage {
    pub fn removing_with(outcome: RemovalOutcome) -> Self {
        Self {
            removal: Mutex::new(Some(outcome)),
            removed: Mutex::new(Vec::new()),
            dirs_ok: false,
        }
    }

    /// Directories can be created but every placement fails.
    pub fn failing_placement() -> Self {
        Self {
            removal: Mutex::new(None),
            removed: Mutex::new(Vec::new()),
            dirs_ok: true,
        }
    }
}

#[async_trait]
impl StoragePort for ScriptedStorage {
    async fn ensure_dir(&self, _dir: &Path) -> anyhow::Result<()> {
        if self.dirs_ok {
            return Ok(());
        }
        anyhow::bail!("not scripted")
    }

    async fn place_file(&self, _temp_path: &Path, target: &Path) -> anyhow::Result<()> {
        anyhow::bail!("copy into {} interrupted", target.display())
    }

    async fn open_read(&self, _path: &Path) -> std::io::Result<FileReader> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not scripted",
        ))
    }

    async fn remove_file(&self, path: &Path) -> RemovalOutcome {
        self.removed.lock().unwrap().push(path.to_path_buf());
        self.removal
            .lock()
            .unwrap()
            .take()
            .unwrap_or(RemovalOutcome::Removed)
    }
}

pub fn sample_file(id: i32, storage_path: &str) -> StoredFile {
    let now = Utc::now();
    StoredFile {
        id,
        original_filename: "informe.pdf".into(),
        stored_filename: "informe_x.pdf".into(),
        mime_type: "application/pdf".into(),
        size_bytes: 4,
        storage_path: storage_path.into(),
        client_id: 0,
        location_id: 0,
        service_type_id: 0,
        periodicity: None,
        equipment_name: None,
        task_id: None,
        service_date: None,
        content_hash: None,
        extra_metadata: None,
        uploaded_by: None,
        uploaded_at: now,
        updated_at: now,
    }
}
