//! Browser pages: the upload form with history, and the upload result.

use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::ServiceResult;

use super::{AppState, read_upload};

pub async fn index_handler(State(state): State<Arc<AppState>>) -> ServiceResult<Html<String>> {
    let history = state.service.documents.history().await?;
    Ok(Html(
        state.pages().index(state.service.storage_mode(), &history),
    ))
}

/// Form upload from the index page. Errors come back as plain text.
pub async fn upload_page_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let result = match read_upload(multipart).await {
        Ok((data, filename)) => state.service.process_document(&data, &filename).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(processed) => {
            Html(state.pages().success(&processed.url, processed.images_rewritten)).into_response()
        }
        Err(e) => (e.status_code(), format!("Error: {}", e)).into_response(),
    }
}
