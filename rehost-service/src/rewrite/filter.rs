//! Deciding which references get rewritten, and what to call the stored file.

use crate::config::StorageMode;

const DEFAULT_FILENAME: &str = "image.jpg";

/// Whether a reference URL should be fetched and re-hosted.
///
/// Only absolute `http(s)` URLs can be fetched. In local mode, URLs that
/// already live under our own site were migrated on an earlier pass.
pub fn is_eligible(url: &str, mode: StorageMode, site_domain: &str) -> bool {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return false;
    }

    !(mode == StorageMode::Local && is_on_site(url, site_domain))
}

/// Whether `url` points under `site_domain`. The prefix must end at a URL
/// boundary, so `http://host:5000` does not claim `http://host:50001`.
fn is_on_site(url: &str, site_domain: &str) -> bool {
    if site_domain.is_empty() {
        return false;
    }

    match url.strip_prefix(site_domain) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

/// Suggested filename for a fetched image: the last path segment of the URL
/// without its query string, or `image.jpg`.
pub fn filename_hint(url: &str) -> String {
    let last_segment = url.rsplit('/').next().unwrap_or("");
    let name = last_segment.split('?').next().unwrap_or("");

    if name.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        name.to_string()
    }
}
