//! Store images on local disk and serve them from this site.

use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::StorageError;

use super::{AssetStore, StoreRequest};

const DEFAULT_EXTENSION: &str = ".jpg";

/// Writes images under `<image_dir>/<group>/` and hands back
/// `<site_domain>/<upload_root>/<group>/<file>`.
pub struct LocalStorage {
    dir: PathBuf,
    upload_root: String,
    site_domain: String,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: config.image_dir(),
            upload_root: config.upload_root.clone(),
            site_domain: config.site_domain.clone(),
        }
    }

    fn public_url(&self, group: &str, filename: &str) -> String {
        let mut url = self.site_domain.clone();
        for segment in [self.upload_root.as_str(), group, filename] {
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }
        url
    }
}

impl AssetStore for LocalStorage {
    async fn store(&self, request: StoreRequest<'_>) -> Result<String, StorageError> {
        let group = sanitize_group(request.group);
        let dir = self.dir.join(&group);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::Io)?;

        let extension = extension_for(request.source_url, request.asset.content_type.as_deref());
        let filename = format!("{}{}", Uuid::new_v4().simple(), extension);
        let path: PathBuf = dir.join(&filename);

        tokio::fs::write(&path, &request.asset.bytes)
            .await
            .map_err(StorageError::Io)?;

        debug!(
            path = %path.display(),
            size = request.asset.bytes.len(),
            "Stored image locally"
        );

        Ok(self.public_url(&group, &filename))
    }
}

/// Strip path traversal from a target group: every `..` is removed, then
/// leading and trailing slashes.
pub fn sanitize_group(group: &str) -> String {
    group.replace("..", "").trim_matches('/').to_string()
}

/// File extension (with leading dot) for a stored image.
///
/// Taken from the source URL's path when it has one, otherwise guessed from
/// the content type, otherwise `.jpg`.
pub fn extension_for(source_url: &str, content_type: Option<&str>) -> String {
    if let Some(ext) = url_path_extension(source_url) {
        return format!(".{}", ext);
    }

    content_type
        .and_then(extension_from_content_type)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn url_path_extension(source_url: &str) -> Option<String> {
    let path = match Url::parse(source_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => source_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    if path.ends_with('/') {
        return None;
    }

    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime: mime::Mime = content_type.parse().ok()?;
    let extensions = mime_guess::get_mime_extensions(&mime)?;

    // Prefer the conventional spelling when the registry knows several.
    extensions
        .iter()
        .find(|ext| **ext == "jpg")
        .or_else(|| extensions.iter().find(|ext| **ext == mime.subtype().as_str()))
        .or_else(|| extensions.first())
        .copied()
}
