//! Markdown image rewriting.
//!
//! Every `![alt](url)` in a document is inspected in order. Eligible images are
//! downloaded, handed to the storage backend, and the reference is rebuilt with
//! the new URL. Anything that goes wrong for a single image leaves that
//! reference exactly as it was.

use tracing::{debug, info, warn};

use crate::config::StorageMode;
use crate::fetch::AssetFetcher;
use crate::storage::{AssetStore, StoreRequest};

pub mod filter;
pub mod scanner;

use filter::{filename_hint, is_eligible};
use scanner::{ImageReference, scan_references};

/// Output of one rewrite pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub content: String,
    /// References whose URL now points at our storage
    pub replaced: usize,
    /// Eligible references left alone because fetch or store failed
    pub failed: usize,
    /// References that were not eligible for rewriting
    pub skipped: usize,
}

/// Rewrites image references using a fetcher and a storage backend.
pub struct Rewriter<'a, F, S> {
    fetcher: &'a F,
    store: &'a S,
    mode: StorageMode,
    site_domain: &'a str,
}

enum Outcome {
    Replaced(String),
    Failed,
    Skipped,
}

impl<'a, F: AssetFetcher, S: AssetStore> Rewriter<'a, F, S> {
    pub fn new(fetcher: &'a F, store: &'a S, mode: StorageMode, site_domain: &'a str) -> Self {
        Self {
            fetcher,
            store,
            mode,
            site_domain,
        }
    }

    /// Rewrite every eligible image in `content`, grouping stored assets under
    /// `group`.
    pub async fn rewrite(&self, content: &str, group: &str) -> RewriteResult {
        let mut output = String::with_capacity(content.len());
        let mut last_end = 0;
        let mut replaced = 0;
        let mut failed = 0;
        let mut skipped = 0;

        // Collected up front so no regex iterator is held across an await.
        let references: Vec<ImageReference<'_>> = scan_references(content).collect();

        for reference in references {
            output.push_str(&content[last_end..reference.span_start]);

            match self.rewrite_reference(&reference, group).await {
                Outcome::Replaced(text) => {
                    output.push_str(&text);
                    replaced += 1;
                }
                Outcome::Failed => {
                    output.push_str(reference.matched);
                    failed += 1;
                }
                Outcome::Skipped => {
                    output.push_str(reference.matched);
                    skipped += 1;
                }
            }

            last_end = reference.span_end;
        }
        output.push_str(&content[last_end..]);

        info!(
            group = %group,
            replaced,
            failed,
            skipped,
            "Rewrote document images"
        );

        RewriteResult {
            content: output,
            replaced,
            failed,
            skipped,
        }
    }

    async fn rewrite_reference(&self, reference: &ImageReference<'_>, group: &str) -> Outcome {
        let url = reference.original_url;

        if !is_eligible(url, self.mode, self.site_domain) {
            debug!(url = %url, "Image not eligible for rewrite");
            return Outcome::Skipped;
        }

        let asset = match self.fetcher.fetch(url).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch image, keeping original link");
                return Outcome::Failed;
            }
        };

        let filename = filename_hint(url);
        let request = StoreRequest {
            asset: &asset,
            source_url: url,
            filename: &filename,
            group,
        };

        match self.store.store(request).await {
            Ok(new_url) => {
                debug!(from = %url, to = %new_url, "Rehosted image");
                Outcome::Replaced(reference.with_url(&new_url))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to store image, keeping original link");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::{FetchError, StorageError};
    use crate::fetch::FetchedAsset;
    use crate::storage::LocalStorage;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns a fixed payload for every URL, except those listed as failing.
    #[derive(Default)]
    struct StubFetcher {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl AssetFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.failing.iter().any(|failing| *failing == url) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                });
            }
            Ok(FetchedAsset {
                bytes: Bytes::from_static(b"img"),
                content_type: Some("image/jpeg".to_string()),
            })
        }
    }

    /// Hands out `http://site/u/<group>/<n>-<filename>` or fails when asked to.
    #[derive(Default)]
    struct StubStore {
        fail: bool,
        stored: Mutex<Vec<(String, String)>>,
    }

    impl AssetStore for StubStore {
        async fn store(&self, request: StoreRequest<'_>) -> Result<String, StorageError> {
            if self.fail {
                return Err(StorageError::MissingUrl);
            }
            let mut stored = self.stored.lock().unwrap();
            stored.push((request.filename.to_string(), request.group.to_string()));
            Ok(format!(
                "http://site/u/{}/{}-{}",
                request.group,
                stored.len(),
                request.filename
            ))
        }
    }

    const SITE: &str = "http://site";

    #[tokio::test]
    async fn test_document_without_images_is_unchanged() {
        let fetcher = StubFetcher::default();
        let store = StubStore::default();
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Cloud, SITE);

        let doc = "# Title\n\nSome [link](https://a.com) and `code`.\n";
        let result = rewriter.rewrite(doc, "doc").await;

        assert_eq!(result.content, doc);
        assert_eq!(result.replaced, 0);
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_rewrite_keeps_alt_text() {
        let fetcher = StubFetcher::default();
        let store = StubStore::default();
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Local, SITE);

        let result = rewriter.rewrite("![a](https://ext.com/i.jpg)", "g").await;

        assert_eq!(result.content, "![a](http://site/u/g/1-i.jpg)");
        assert_eq!(result.replaced, 1);
        assert_eq!(
            store.stored.lock().unwrap()[0],
            ("i.jpg".to_string(), "g".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_reference_unchanged() {
        let fetcher = StubFetcher {
            failing: vec!["https://ext.com/i.jpg"],
            ..Default::default()
        };
        let store = StubStore::default();
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Cloud, SITE);

        let doc = "![a](https://ext.com/i.jpg)";
        let result = rewriter.rewrite(doc, "g").await;

        assert_eq!(result.content, doc);
        assert_eq!(result.failed, 1);
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_leaves_reference_unchanged() {
        let fetcher = StubFetcher::default();
        let store = StubStore {
            fail: true,
            ..Default::default()
        };
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Cloud, SITE);

        let doc = "before ![a](https://ext.com/i.jpg) after";
        let result = rewriter.rewrite(doc, "g").await;

        assert_eq!(result.content, doc);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn test_mixed_document_preserves_order_and_text() {
        let fetcher = StubFetcher {
            failing: vec!["https://ext.com/broken.png"],
            ..Default::default()
        };
        let store = StubStore::default();
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Cloud, SITE);

        let doc = "\
intro ![one](https://ext.com/one.png?v=1)
![local](./img/two.png)
![three](https://ext.com/broken.png) and ![four](http://other.org/p/)
";
        let result = rewriter.rewrite(doc, "notes").await;

        assert_eq!(
            result.content,
            "\
intro ![one](http://site/u/notes/1-one.png)
![local](./img/two.png)
![three](https://ext.com/broken.png) and ![four](http://site/u/notes/2-image.jpg)
"
        );
        assert_eq!(result.replaced, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec![
                "https://ext.com/one.png?v=1",
                "https://ext.com/broken.png",
                "http://other.org/p/",
            ]
        );
    }

    #[tokio::test]
    async fn test_local_mode_skips_own_site() {
        let fetcher = StubFetcher::default();
        let store = StubStore::default();
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Local, SITE);

        let doc = "![done](http://site/static/uploads/g/abc.png)";
        let result = rewriter.rewrite(doc, "g").await;

        assert_eq!(result.content, doc);
        assert_eq!(result.skipped, 1);
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_mode_second_pass_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let storage_config = StorageConfig {
            mode: StorageMode::Local,
            site_domain: SITE.to_string(),
            upload_dir: Some(tmp.path().join("uploads")),
            ..StorageConfig::default()
        };
        let fetcher = StubFetcher::default();
        let store = LocalStorage::new(&storage_config);
        let rewriter = Rewriter::new(&fetcher, &store, StorageMode::Local, SITE);

        let doc = "![a](https://ext.com/a.png)\n![b](https://ext.com/b)\n";
        let first = rewriter.rewrite(doc, "doc").await;
        assert_eq!(first.replaced, 2);
        assert!(!first.content.contains("ext.com"));

        let second = rewriter.rewrite(&first.content, "doc").await;
        assert_eq!(second.content, first.content);
        assert_eq!(second.replaced, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
    }
}
