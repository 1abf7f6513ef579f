//! Persistence strategies for re-hosted images.
//!
//! The rewriter only sees [`AssetStore`]; which concrete backend sits behind it
//! is decided once, at startup, from [`StorageMode`].

use std::future::Future;

use crate::config::{AppConfig, StorageMode};
use crate::error::{ServiceResult, StorageError};
use crate::fetch::FetchedAsset;

pub mod cloud;
pub mod local;

pub use cloud::CloudStorage;
pub use local::LocalStorage;

/// Everything a backend may need to persist one image.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub asset: &'a FetchedAsset,
    /// URL the image was fetched from
    pub source_url: &'a str,
    /// Suggested filename derived from the source URL
    pub filename: &'a str,
    /// Target group (document name without extension)
    pub group: &'a str,
}

/// Destination for fetched images. Returns the new public URL.
pub trait AssetStore: Send + Sync {
    fn store(
        &self,
        request: StoreRequest<'_>,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;
}

/// The configured storage backend
pub enum StorageBackend {
    Cloud(CloudStorage),
    Local(LocalStorage),
}

impl StorageBackend {
    /// Build the backend selected by `storage.mode`
    pub fn from_config(config: &AppConfig) -> ServiceResult<Self> {
        match config.storage.mode {
            StorageMode::Cloud => Ok(StorageBackend::Cloud(CloudStorage::new(&config.cloud)?)),
            StorageMode::Local => Ok(StorageBackend::Local(LocalStorage::new(&config.storage))),
        }
    }

    pub fn mode(&self) -> StorageMode {
        match self {
            StorageBackend::Cloud(_) => StorageMode::Cloud,
            StorageBackend::Local(_) => StorageMode::Local,
        }
    }
}

impl AssetStore for StorageBackend {
    async fn store(&self, request: StoreRequest<'_>) -> Result<String, StorageError> {
        match self {
            StorageBackend::Cloud(cloud) => cloud.store(request).await,
            StorageBackend::Local(local) => local.store(request).await,
        }
    }
}
