pub mod delete_file;
pub mod download_file;
pub mod error;
pub mod list_files;
pub mod upload_file;

pub use error::FileServiceError;
