mod sessions;

pub use sessions::SessionStore;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, StorageMode};
use crate::documents::{DocumentLibrary, decode_lossy, target_group};
use crate::error::{ServiceError, ServiceResult};
use crate::fetch::HttpFetcher;
use crate::i18n::I18n;
use crate::rewrite::Rewriter;
use crate::storage::StorageBackend;

/// A document that went through the rewrite pipeline and was saved
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub filename: String,
    pub url: String,
    pub images_rewritten: usize,
}

/// Main service coordinator
pub struct RehostService {
    pub config: Arc<AppConfig>,
    pub i18n: Arc<I18n>,
    pub sessions: SessionStore,
    pub documents: DocumentLibrary,
    fetcher: HttpFetcher,
    storage: StorageBackend,
}

impl RehostService {
    /// Create a new service instance
    pub fn new(config: Arc<AppConfig>) -> ServiceResult<Self> {
        info!(mode = %config.storage.mode, "Initializing rehost service");

        config.storage.validate()?;

        let fetcher = HttpFetcher::new(config.limits.max_image_size_bytes)?;
        let storage = StorageBackend::from_config(&config)?;
        let documents = DocumentLibrary::new(&config.storage);

        let i18n = Arc::new(I18n::new());
        if !i18n.has_locale(&config.ui.locale) {
            warn!(
                locale = %config.ui.locale,
                "Configured locale has no translations, falling back to English"
            );
        }

        Ok(Self {
            config,
            i18n,
            sessions: SessionStore::default(),
            documents,
            fetcher,
            storage,
        })
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage.mode()
    }

    pub fn locale(&self) -> &str {
        &self.config.ui.locale
    }

    /// Whether `token` matches the configured access token
    pub fn check_token(&self, token: &str) -> bool {
        !token.is_empty() && token == self.config.auth.app_token
    }

    /// Rewrite the images of an uploaded document and save the result.
    pub async fn process_document(
        &self,
        data: &[u8],
        filename: &str,
    ) -> ServiceResult<ProcessedDocument> {
        let max = self.config.limits.max_document_size_bytes;
        let size = data.len() as u64;
        if size > max {
            return Err(ServiceError::FileTooLarge { size, max });
        }
        if filename.is_empty() {
            return Err(ServiceError::EmptyFilename);
        }

        let group = target_group(filename);
        let content = decode_lossy(data);

        info!(filename = %filename, group = %group, size, "Processing document");

        let rewriter = Rewriter::new(
            &self.fetcher,
            &self.storage,
            self.storage_mode(),
            &self.config.storage.site_domain,
        );
        let result = rewriter.rewrite(&content, &group).await;

        let saved_name = self.documents.save(filename, &result.content).await?;
        let url = self.config.storage.download_url(&saved_name);

        info!(
            filename = %saved_name,
            images_rewritten = result.replaced,
            failed = result.failed,
            "Document processed"
        );

        Ok(ProcessedDocument {
            filename: saved_name,
            url,
            images_rewritten: result.replaced,
        })
    }
}
