pub mod file;
pub mod storage_path;
