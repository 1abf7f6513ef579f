use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Boundary-level service error. Anything that reaches the caller as a
/// failure of the whole request goes through here.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Empty filename")]
    EmptyFilename,

    #[error("File not found: {filename}")]
    DocumentNotFound { filename: String },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failure to download a referenced image. Never fatal for the document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("image from {url} exceeds {max} bytes")]
    TooLarge { url: String, max: u64 },
}

/// Failure to persist a fetched image. Never fatal for the document.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("upload request failed")]
    Upload(#[source] reqwest::Error),

    #[error("upload endpoint returned status {status}")]
    Status { status: u16 },

    #[error("upload response carried no url")]
    MissingUrl,

    #[error("failed to write image")]
    Io(#[source] std::io::Error),
}

/// API error body, shaped like the rest of our JSON responses
#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NoFile
            | ServiceError::EmptyFilename
            | ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Io(_) | ServiceError::Config { .. } | ServiceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let response = ErrorResponse {
            code: status.as_u16(),
            error: self.to_string(),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::NoFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::DocumentNotFound {
                filename: "a.md".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::FileTooLarge { size: 2, max: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServiceError::Io(std::io::Error::other("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
