use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod documents;
mod error;
mod fetch;
mod i18n;
mod render;
mod rewrite;
mod service;
mod storage;

use crate::config::{AppConfig, StorageMode};
use crate::service::RehostService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting rehost service v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(AppConfig::load()?);

    info!(
        host = %config.server.host,
        port = config.server.port,
        mode = %config.storage.mode,
        site_domain = %config.storage.site_domain,
        "Configuration loaded"
    );

    // Ensure storage directories exist
    std::fs::create_dir_all(&config.storage.documents_dir)?;
    if config.storage.mode == StorageMode::Local {
        std::fs::create_dir_all(config.storage.image_dir())?;
    }

    let service = Arc::new(RehostService::new(config.clone())?);

    let app = api::router(service);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rehost_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
