//! Upload to a remote image hosting endpoint.

use reqwest::{Client, multipart};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::CloudConfig;
use crate::error::{ServiceError, ServiceResult, StorageError};

use super::{AssetStore, StoreRequest};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_USER_AGENT: &str = "Apifox/1.0.0 (https://apifox.com)";

/// Client for the configured upload endpoint.
///
/// The endpoint takes `authCode` and `uploadFolder` as query parameters and
/// the image as multipart field `file`.
pub struct CloudStorage {
    client: Client,
    upload_url: String,
    auth_code: String,
}

impl CloudStorage {
    pub fn new(config: &CloudConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .user_agent(UPLOAD_USER_AGENT)
            .build()
            .map_err(|e| ServiceError::Internal {
                message: format!("Failed to build upload client: {}", e),
            })?;

        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            auth_code: config.auth_code.clone(),
        })
    }
}

impl AssetStore for CloudStorage {
    async fn store(&self, request: StoreRequest<'_>) -> Result<String, StorageError> {
        let part = multipart::Part::bytes(request.asset.bytes.to_vec())
            .file_name(request.filename.to_string())
            .mime_str(mime::APPLICATION_OCTET_STREAM.as_ref())
            .map_err(StorageError::Upload)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[
                ("authCode", self.auth_code.as_str()),
                ("uploadFolder", request.group),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(StorageError::Upload)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(StorageError::Upload)?;
        let url = extract_uploaded_url(&body).ok_or(StorageError::MissingUrl)?;

        debug!(
            filename = %request.filename,
            group = %request.group,
            url = %url,
            "Uploaded image"
        );

        Ok(url)
    }
}

/// Pull the hosted URL out of an upload response.
///
/// Checked in order: top-level `url`, `data.url`, then `data` itself when it
/// is a string.
fn extract_uploaded_url(body: &Value) -> Option<String> {
    if let Some(url) = body.get("url").and_then(Value::as_str) {
        return Some(url.to_string());
    }

    match body.get("data")? {
        Value::Object(data) => data.get("url").and_then(Value::as_str).map(str::to_string),
        Value::String(url) => Some(url.clone()),
        _ => None,
    }
}
