//! Flat-file storage for processed Markdown documents.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::{ServiceError, ServiceResult};

/// One processed document as shown in the history list
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub filename: String,
    pub real_filename: String,
    pub timestamp: String,
    pub timestamp_sort: f64,
    pub url: String,
}

/// Directory of processed documents
pub struct DocumentLibrary {
    dir: PathBuf,
    site_domain: String,
}

impl DocumentLibrary {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: config.documents_dir.clone(),
            site_domain: config.site_domain.clone(),
        }
    }

    /// Save a processed document under the base name of `filename`, replacing
    /// any earlier version. Returns the name it was saved under.
    pub async fn save(&self, filename: &str, content: &str) -> ServiceResult<String> {
        let safe_name = base_name(filename).ok_or_else(|| ServiceError::InvalidRequest {
            message: format!("Invalid filename: {}", filename),
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&safe_name);
        tokio::fs::write(&path, content).await?;

        debug!(path = %path.display(), size = content.len(), "Saved processed document");

        Ok(safe_name)
    }

    /// Locate a saved document by name. Only the base name is honored.
    pub async fn open(&self, filename: &str) -> Option<(String, PathBuf)> {
        let safe_name = base_name(filename)?;
        let path = self.dir.join(&safe_name);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some((safe_name, path)),
            _ => None,
        }
    }

    /// All saved Markdown documents, newest first
    pub async fn history(&self) -> ServiceResult<Vec<HistoryEntry>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut history = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !filename.ends_with(".md") {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => Some(modified),
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Could not read modification time");
                    None
                }
            };

            let (timestamp, timestamp_sort) = match modified {
                Some(modified) => (
                    DateTime::<Local>::from(modified)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                    modified
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0),
                ),
                None => ("Unknown".to_string(), 0.0),
            };

            // The mtime query parameter keeps browsers from serving a stale copy.
            let url = format!(
                "{}/api/download/{}?t={}",
                self.site_domain,
                urlencoding::encode(&filename),
                timestamp_sort as u64
            );

            history.push(HistoryEntry {
                filename: filename.clone(),
                real_filename: filename,
                timestamp,
                timestamp_sort,
                url,
            });
        }

        history.sort_by(|a, b| b.timestamp_sort.total_cmp(&a.timestamp_sort));
        Ok(history)
    }
}

/// Final path component of an uploaded filename, if it has one.
pub fn base_name(filename: &str) -> Option<String> {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Target group for a document: its filename with the extension removed.
///
/// A leading dot does not start an extension, so `.md` stays `.md`.
pub fn target_group(filename: &str) -> String {
    let base_start = filename.rfind('/').map_or(0, |i| i + 1);
    let base = &filename[base_start..];
    let name_start = base.len() - base.trim_start_matches('.').len();

    match base.rfind('.') {
        Some(dot) if dot > name_start => filename[..base_start + dot].to_string(),
        _ => filename.to_string(),
    }
}

/// Decode uploaded bytes as UTF-8, dropping any invalid sequences.
pub fn decode_lossy(data: &[u8]) -> String {
    let mut text = String::with_capacity(data.len());
    for chunk in data.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
