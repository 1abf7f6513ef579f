//! Process-wide settings, loaded once at startup.
//!
//! Values come from an optional `config.{toml,yaml,json}` file and from
//! `REHOST__`-prefixed environment variables, e.g. `REHOST__STORAGE__MODE=local`.

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{ServiceError, ServiceResult};

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cloud: CloudConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Shared-token login gate
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_app_token")]
    pub app_token: String,
}

/// Where rewritten images and processed documents end up
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub mode: StorageMode,

    /// Public base URL of this site, without a trailing slash
    #[serde(default = "default_site_domain")]
    pub site_domain: String,

    /// URL path locally stored images are served under. Also their directory,
    /// relative to the working directory, unless `upload_dir` is set.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,

    /// Directory for locally stored images when it should not follow `upload_root`
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    /// Directory holding processed Markdown files
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
}

/// Remote upload endpoint used in cloud mode
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    #[serde(default = "default_auth_code")]
    pub auth_code: String,
}

/// Size limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_document_size")]
    pub max_document_size_bytes: u64,

    /// Largest image the rewriter will download
    #[serde(default = "default_max_image_size")]
    pub max_image_size_bytes: u64,
}

/// Page rendering options
#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
}

/// Storage strategy, selected once at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StorageMode {
    #[default]
    Cloud,
    Local,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Cloud => "cloud",
            StorageMode::Local => "local",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StorageMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "cloud" => Ok(StorageMode::Cloud),
            "local" => Ok(StorageMode::Local),
            other => Err(format!(
                "unknown storage mode '{}', expected 'cloud' or 'local'",
                other
            )),
        }
    }
}

impl From<StorageMode> for String {
    fn from(mode: StorageMode) -> Self {
        mode.as_str().to_string()
    }
}

impl AppConfig {
    /// Load configuration from `config.*` and `REHOST__*` environment variables
    pub fn load() -> ServiceResult<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config").required(false))
                .add_source(
                    Environment::with_prefix("REHOST")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> ServiceResult<Self> {
        let config: AppConfig = builder
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })?;

        let config = config.normalized();
        config.storage.validate()?;
        Ok(config)
    }

    fn normalized(mut self) -> Self {
        self.storage.site_domain = self.storage.site_domain.trim_end_matches('/').to_string();
        self.storage.upload_root = self.storage.upload_root.trim_end_matches('/').to_string();
        self
    }
}

impl StorageConfig {
    /// Check that `upload_root` can be mounted as a URL path.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.upload_root.is_empty() || self.upload_root == "/" {
            return Err(ServiceError::Config {
                message: "storage.upload_root must not be empty".to_string(),
            });
        }
        if self.upload_root.starts_with('/') {
            return Err(ServiceError::Config {
                message: format!(
                    "storage.upload_root '{}' must be a relative path: it is used both as a \
                     filesystem path and as a URL path. Set storage.upload_dir to store \
                     images elsewhere.",
                    self.upload_root
                ),
            });
        }
        Ok(())
    }

    /// Directory locally stored images are written to
    pub fn image_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.upload_root))
    }

    /// Public download link for a processed document
    pub fn download_url(&self, filename: &str) -> String {
        format!(
            "{}/api/download/{}",
            self.site_domain,
            urlencoding::encode(filename)
        )
    }
}

// ==================== Default Value Functions ====================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_token: default_app_token(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            site_domain: default_site_domain(),
            upload_root: default_upload_root(),
            upload_dir: None,
            documents_dir: default_documents_dir(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            upload_url: default_upload_url(),
            auth_code: default_auth_code(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_size_bytes: default_max_document_size(),
            max_image_size_bytes: default_max_image_size(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_app_token() -> String {
    "admin123".to_string()
}

fn default_site_domain() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_upload_root() -> String {
    "static/uploads".to_string()
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("static/temp_md")
}

fn default_upload_url() -> String {
    "https://your.domain/upload".to_string()
}

fn default_auth_code() -> String {
    "your_authCode".to_string()
}

fn default_max_document_size() -> u64 {
    16 * 1024 * 1024 // 16MB
}

fn default_max_image_size() -> u64 {
    20 * 1024 * 1024 // 20MB
}

fn default_locale() -> String {
    "en".to_string()
}
