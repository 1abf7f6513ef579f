//! Downloading images referenced from Markdown documents.

use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, header, redirect};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, ServiceError, ServiceResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const FETCH_USER_AGENT: &str = "Mozilla/5.0";

/// Bytes of one downloaded image, held only until it has been stored.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Source of image bytes for the rewriter.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedAsset, FetchError>> + Send;
}

/// Plain HTTP GET fetcher.
///
/// Redirects are not followed: anything other than a direct 200 is a miss.
pub struct HttpFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Fetcher that gives up on images larger than `max_bytes`
    pub fn new(max_bytes: u64) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(FETCH_USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ServiceError::Internal {
                message: format!("Failed to build image fetch client: {}", e),
            })?;

        Ok(Self { client, max_bytes })
    }
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            max: self.max_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong, so the limit is enforced while reading.
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let bytes = body.freeze();

        if bytes.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!(
            url = %url,
            size = bytes.len(),
            content_type = ?content_type,
            "Fetched image"
        );

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}
