use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use file_vault::application::ports::files_repository::FilesRepository;
use file_vault::application::ports::storage_port::StoragePort;
use file_vault::bootstrap::app_context::{AppContext, AppServices};
use file_vault::bootstrap::config::Config;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            file_vault::presentation::http::files::upload_file,
            file_vault::presentation::http::files::download_file,
            file_vault::presentation::http::files::list_files,
            file_vault::presentation::http::files::delete_file,
            file_vault::presentation::http::health::health,
            file_vault::presentation::http::health::root,
        ),
        components(schemas(
            file_vault::presentation::http::files::FileResponse,
            file_vault::presentation::http::files::ClientItem,
            file_vault::presentation::http::files::LocationItem,
            file_vault::presentation::http::files::ServiceTypeItem,
            file_vault::presentation::http::files::FileListItem,
            file_vault::presentation::http::files::PaginationResponse,
            file_vault::presentation::http::files::FileListResponse,
            file_vault::presentation::http::files::UploadFileResponse,
            file_vault::presentation::http::files::UploadFileMultipart,
            file_vault::presentation::http::files::DeleteFileResponse,
            file_vault::presentation::http::error::ErrorResponse,
            file_vault::application::validation::FieldError,
            file_vault::presentation::http::health::HealthResp,
        )),
        tags(
            (name = "Files", description = "File upload, download, listing and deletion"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

fn cors_layer(cfg: &Config) -> CorsLayer {
    let methods = [
        http::Method::GET,
        http::Method::POST,
        http::Method::DELETE,
        http::Method::OPTIONS,
    ];
    let origin = match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(v)) => AllowOrigin::exact(v),
        Some(Err(_)) | None if cfg.is_production => {
            // Unreachable after config validation; deny everything
            AllowOrigin::exact(HeaderValue::from_static("http://invalid"))
        }
        _ => AllowOrigin::mirror_request(),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "ctrl_c_listener_failed");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "sigterm_listener_failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown_signal_received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "file_vault=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(?cfg, "Starting file storage service");

    // Database
    let pool =
        file_vault::infrastructure::db::connect_pool(&cfg.database_url, cfg.database_max_connections)
            .await?;
    file_vault::infrastructure::db::migrate(&pool).await?;

    // Ensure uploads dir exists
    let uploads_root = std::path::PathBuf::from(&cfg.uploads_dir);
    if let Err(e) = tokio::fs::create_dir_all(&uploads_root).await {
        tracing::warn!(error = ?e, dir = %cfg.uploads_dir, "Failed to create uploads dir");
    }

    let files_repo: Arc<dyn FilesRepository> = Arc::new(
        file_vault::infrastructure::db::repositories::files_repository_sqlx::SqlxFilesRepository::new(
            pool.clone(),
        ),
    );
    let storage_port: Arc<dyn StoragePort> = Arc::new(
        file_vault::infrastructure::storage::port_impl::FsStoragePort::new(&uploads_root),
    );
    let services = AppServices::new(files_repo, storage_port, uploads_root);
    let ctx = AppContext::new(cfg.clone(), services);

    let app = Router::new()
        .merge(file_vault::presentation::http::health::root_routes())
        .nest(
            "/api",
            file_vault::presentation::http::health::routes(pool.clone()),
        )
        .nest(
            "/api/v1",
            file_vault::presentation::http::files::routes(ctx.clone()),
        )
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&cfg))
        // Global body size limit for uploads (configurable)
        .layer(DefaultBodyLimit::max(cfg.upload_max_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server stopped");
    Ok(())
}
