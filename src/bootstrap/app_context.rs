use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::StoragePort;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    files_repo: Arc<dyn FilesRepository>,
    storage_port: Arc<dyn StoragePort>,
    uploads_root: PathBuf,
}

impl AppServices {
    pub fn new(
        files_repo: Arc<dyn FilesRepository>,
        storage_port: Arc<dyn StoragePort>,
        uploads_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            files_repo,
            storage_port,
            uploads_root: uploads_root.into(),
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn files_repo(&self) -> Arc<dyn FilesRepository> {
        self.services.files_repo.clone()
    }

    pub fn storage_port(&self) -> Arc<dyn StoragePort> {
        self.services.storage_port.clone()
    }

    /// Root under which every stored file and in-flight upload lives.
    pub fn uploads_root(&self) -> &Path {
        &self.services.uploads_root
    }
}
