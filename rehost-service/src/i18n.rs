use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

const DEFAULT_LOCALE: &str = "en";

/// Internationalization service using Fluent (thread-safe)
pub struct I18n {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    default_locale: String,
}

impl I18n {
    /// Create a new i18n service with the embedded translations
    pub fn new() -> Self {
        let mut i18n = Self {
            bundles: HashMap::new(),
            default_locale: DEFAULT_LOCALE.to_string(),
        };

        for (locale, content) in [("en", EN_TRANSLATIONS), ("zh-CN", ZH_CN_TRANSLATIONS)] {
            if let Err(e) = i18n.add_locale(locale, content) {
                warn!(locale = %locale, error = %e, "Failed to load embedded translations");
            }
        }

        i18n
    }

    /// Add a locale with translations
    pub fn add_locale(&mut self, locale: &str, content: &str) -> Result<(), String> {
        let lang_id: LanguageIdentifier = locale
            .parse()
            .map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;

        let resource = FluentResource::try_new(content.to_string())
            .map_err(|(_, errors)| format!("Failed to parse Fluent resource: {:?}", errors))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        // Output lands in HTML, where bidi isolation marks only get in the way.
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| format!("Failed to add resource to bundle: {:?}", errors))?;

        self.bundles.insert(locale.to_string(), bundle);

        debug!(locale = %locale, "Loaded translations");

        Ok(())
    }

    /// Whether translations for `locale` are available
    pub fn has_locale(&self, locale: &str) -> bool {
        self.bundles.contains_key(locale)
    }

    /// Get a translated message
    pub fn get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        // Try requested locale, fall back to default, fall back to key
        self.try_get(locale, key, args)
            .or_else(|| self.try_get(&self.default_locale, key, args))
            .unwrap_or_else(|| key.to_string())
    }

    /// Try to get a translation from a specific locale
    fn try_get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundle = self.bundles.get(locale)?;
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;

        let mut errors = vec![];
        let result = bundle.format_pattern(pattern, args, &mut errors);

        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        Some(result.to_string())
    }

    /// Get a translated message with arguments
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (k, v) in args {
            fluent_args.set(*k, *v);
        }
        self.get(locale, key, Some(&fluent_args))
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}

const EN_TRANSLATIONS: &str = r#"
# Pages
page-title = Markdown Image Migrator

# Login
login-title = Sign in
login-token-placeholder = Token
login-submit = Enter
login-invalid-token = Invalid token

# Upload
index-heading = Markdown image migration
index-logout = Log out
index-drop-hint = Click or drop a Markdown file
index-choose-file = Choose a file first
index-start = Start processing
index-processing = Processing...

# History
history-heading = Processed files
history-search = Search file names...
history-col-name = File name
history-col-time = Processed at
history-col-action = Action
history-download = Download
history-empty = No files yet
history-no-match = No matching files

# Result
success-title = Done!
success-saved = The file has been saved. { $count } images were re-hosted.
success-download = Download now
success-back = Back to list

# Health
health-status-healthy = Service is healthy
"#;

const ZH_CN_TRANSLATIONS: &str = r#"
page-title = Markdown 资源迁移器

login-title = 系统登录
login-token-placeholder = Token
login-submit = 进入系统
login-invalid-token = 无效的 Token

index-heading = MD 图片迁移
index-logout = 退出
index-drop-hint = 点击或拖拽 Markdown 文件
index-choose-file = 请先选择文件
index-start = 开始处理
index-processing = 正在处理...

history-heading = 历史文件列表
history-search = 搜索文件名...
history-col-name = 文件名
history-col-time = 处理时间
history-col-action = 操作
history-download = 下载
history-empty = 暂无记录
history-no-match = 未找到匹配的文件

success-title = 处理成功!
success-saved = 文件已保存，共迁移 { $count } 张图片。
success-download = 立即下载
success-back = 返回列表

health-status-healthy = 服务运行正常
"#;
