//! HTTP API for the rehost service.
//!
//! This module provides:
//! - Token login and session cookies
//! - The browser upload page and its history table
//! - JSON endpoints for processing, history and downloads
//! - Static serving of locally stored images

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    middleware,
    routing::{get, post},
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::{ServiceError, ServiceResult};
use crate::render::Pages;
use crate::service::RehostService;

pub mod auth;
pub mod documents;
pub mod pages;
use auth::{login_handler, login_page_handler, logout_handler, require_api_auth, require_page_auth};
use documents::{download_handler, history_handler, process_handler};
use pages::{index_handler, upload_page_handler};

/// Headroom on top of the document limit for multipart framing
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state
pub struct AppState {
    pub service: Arc<RehostService>,
    pub start_time: Instant,
}

impl AppState {
    /// Page renderer for the configured locale
    pub fn pages(&self) -> Pages<'_> {
        Pages::new(&self.service.i18n, self.service.locale())
    }
}

/// Build the router
pub fn router(service: Arc<RehostService>) -> Router {
    let config = service.config.clone();

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body_size =
        config.limits.max_document_size_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .route(
            "/process",
            post(process_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/history", get(history_handler))
        .route("/download/{filename}", get(download_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_auth,
        ));

    let page_routes = Router::new()
        .route(
            "/",
            get(index_handler)
                .post(upload_page_handler)
                .layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_page_auth,
        ));

    let uploads_path = format!("/{}", config.storage.upload_root);

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/logout", get(logout_handler))
        .merge(page_routes)
        .nest("/api", api_routes)
        .nest_service(&uploads_path, ServeDir::new(config.storage.image_dir()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pull the `file` field out of an upload form.
pub async fn read_upload(mut multipart: Multipart) -> ServiceResult<(Bytes, String)> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::InvalidRequest {
                message: e.to_string(),
            })?;
        let Some(field) = field else {
            return Err(ServiceError::NoFile);
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::InvalidRequest {
                message: e.to_string(),
            })?;

        if filename.is_empty() {
            return Err(ServiceError::EmptyFilename);
        }
        return Ok((data, filename));
    }
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state
            .service
            .i18n
            .get(state.service.locale(), "health-status-healthy", None),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        storage_mode: state.service.storage_mode().to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    storage_mode: String,
}
