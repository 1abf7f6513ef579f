//! Document API endpoints: process an upload, list history, download results.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use crate::documents::HistoryEntry;
use crate::error::{ServiceError, ServiceResult};

use super::{AppState, read_upload};

/// Response for a processed upload
#[derive(Serialize)]
pub struct ProcessResponse {
    pub code: u16,
    pub message: String,
    pub filename: String,
    pub url: String,
    pub images_rewritten: usize,
}

/// Response for the history listing
#[derive(Serialize)]
pub struct HistoryResponse {
    pub code: u16,
    pub message: String,
    pub data: Vec<HistoryEntry>,
}

/// Rewrite the images of an uploaded Markdown file
pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ServiceResult<Json<ProcessResponse>> {
    let (data, filename) = read_upload(multipart).await?;
    let processed = state.service.process_document(&data, &filename).await?;

    Ok(Json(ProcessResponse {
        code: 200,
        message: "success".to_string(),
        filename: processed.filename,
        url: processed.url,
        images_rewritten: processed.images_rewritten,
    }))
}

/// List processed documents, newest first
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
) -> ServiceResult<Json<HistoryResponse>> {
    let data = state.service.documents.history().await?;

    Ok(Json(HistoryResponse {
        code: 200,
        message: "success".to_string(),
        data,
    }))
}

/// Serve a processed document as a Markdown attachment
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ServiceResult<Response> {
    let (name, path) = state
        .service
        .documents
        .open(&filename)
        .await
        .ok_or_else(|| ServiceError::DocumentNotFound {
            filename: filename.clone(),
        })?;

    let content = tokio::fs::read(&path).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&name)
    ))
    .map_err(|e| ServiceError::Internal {
        message: format!("Invalid download header: {}", e),
    })?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{TOKEN, body_json, multipart_body, multipart_request, test_app};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::get,
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    fn authed_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
            .body(Body::empty())
            .unwrap()
    }

    async fn spawn_image_host() -> String {
        let app = Router::new().route(
            "/pic.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], "png-bytes") }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_process_rewrites_and_saves() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);
        let host = spawn_image_host().await;

        let doc = format!(
            "# Trip\n![pic]({host}/pic.png)\n![gone]({host}/missing.png)\n",
            host = host
        );
        let response = app
            .clone()
            .oneshot(multipart_request("/api/process", multipart_body("trip.md", &doc)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["code"], 200);
        assert_eq!(json["message"], "success");
        assert_eq!(json["filename"], "trip.md");
        assert_eq!(json["url"], "http://site/api/download/trip.md");
        assert_eq!(json["images_rewritten"], 1);

        let saved = std::fs::read_to_string(tmp.path().join("docs/trip.md")).unwrap();
        assert!(!saved.contains(&format!("{}/pic.png", host)));
        let rehosted =
            regex::Regex::new(r"!\[pic\]\(http://site/static/uploads/trip/[0-9a-f]{32}\.png\)")
                .unwrap();
        assert!(rehosted.is_match(&saved), "unexpected document {}", saved);
        assert!(saved.contains(&format!("![gone]({}/missing.png)", host)));

        let stored: Vec<_> = std::fs::read_dir(tmp.path().join("uploads/trip"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with(".png"));
        assert_eq!(
            std::fs::read(tmp.path().join("uploads/trip").join(&stored[0])).unwrap(),
            b"png-bytes"
        );

        let response = app.oneshot(authed_get("/api/history")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"][0]["filename"], "trip.md");
    }

    #[tokio::test]
    async fn test_oversize_upload_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        let doc = "x".repeat(2048);
        let response = app
            .oneshot(multipart_request("/api/process", multipart_body("big.md", &doc)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!tmp.path().join("docs/big.md").exists());
    }

    #[tokio::test]
    async fn test_download_serves_markdown_attachment() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        std::fs::create_dir_all(tmp.path().join("docs")).unwrap();
        std::fs::write(tmp.path().join("docs/notes.md"), "# notes").unwrap();

        let response = app
            .oneshot(authed_get("/api/download/notes.md"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/markdown")
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''notes.md"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"# notes");
    }

    #[tokio::test]
    async fn test_download_missing_file_is_404() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = test_app(&tmp);

        let response = app
            .oneshot(authed_get("/api/download/missing.md"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], 404);
    }
}
