pub mod files_repository_sqlx;
