pub mod admissions;
pub mod api;
pub mod billing;
pub mod claims;
pub mod config;
pub mod consultation;
pub mod db;
pub mod errors;
pub mod laboratory;
pub mod models;
pub mod pharmacy;
pub mod pricing;

use tracing_subscriber::EnvFilter;

/// Start the engine: open (and migrate) the database, then serve the API
/// until the process is stopped.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::open_database(&db_path)?;
    tracing::info!(path = %db_path.display(), "Database ready");

    let ctx = api::ApiContext::new(conn);
    let app = api::api_router(ctx);

    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
