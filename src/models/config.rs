//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the examination page comes from
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP client behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Polling and novelty tracking
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Observers to register
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.monitor.poll_interval_ms == 0 {
            return Err(AppError::validation("monitor.poll_interval_ms must be > 0"));
        }
        if self.monitor.state_key.trim().is_empty() {
            return Err(AppError::validation("monitor.state_key is empty"));
        }
        if self.source.table_id.trim().is_empty() {
            return Err(AppError::validation("source.table_id is empty"));
        }
        Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url: {e}")))?;
        Url::parse(&self.source.page_url)
            .map_err(|e| AppError::validation(format!("source.page_url: {e}")))?;
        if self.source.mode == SourceMode::Proxy {
            match self.source.proxy_url.as_deref() {
                Some(proxy) => {
                    Url::parse(proxy)
                        .map_err(|e| AppError::validation(format!("source.proxy_url: {e}")))?;
                }
                None => {
                    return Err(AppError::validation(
                        "source.proxy_url is required in proxy mode",
                    ));
                }
            }
        }
        for (name, value) in [
            ("notify.webhook_url", &self.notify.webhook_url),
            ("notify.subscribe_url", &self.notify.subscribe_url),
        ] {
            if let Some(url) = value {
                Url::parse(url).map_err(|e| AppError::validation(format!("{name}: {e}")))?;
            }
        }
        Ok(())
    }
}

/// How the page HTML is obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Through the JSON proxy envelope
    #[default]
    Proxy,
    /// Straight from the university site
    Direct,
}

/// Source page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,

    /// Proxy endpoint returning `{success, data, error}`
    #[serde(default = "defaults::proxy_url")]
    pub proxy_url: Option<String>,

    /// The examination schedule page
    #[serde(default = "defaults::page_url")]
    pub page_url: String,

    /// Origin that relative notice links are resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// `id` attribute of the notice table
    #[serde(default = "defaults::table_id")]
    pub table_id: String,
}

impl SourceConfig {
    /// URL handed to the fetcher for the configured mode.
    pub fn fetch_url(&self) -> &str {
        match self.mode {
            SourceMode::Proxy => self.proxy_url.as_deref().unwrap_or(&self.page_url),
            SourceMode::Direct => &self.page_url,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            proxy_url: defaults::proxy_url(),
            page_url: defaults::page_url(),
            base_url: defaults::base_url(),
            table_id: defaults::table_id(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Polling and novelty tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between polls in milliseconds
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Watermark used when the store holds no value
    #[serde(default = "defaults::initial_watermark")]
    pub initial_watermark: u64,

    /// Key under which the watermark is stored
    #[serde(default = "defaults::state_key")]
    pub state_key: String,

    /// Scan every row instead of stopping at the first seen notice
    #[serde(default)]
    pub full_scan: bool,

    /// Extra attempts when writing the watermark fails
    #[serde(default = "defaults::persist_retries")]
    pub persist_retries: u32,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::poll_interval(),
            initial_watermark: defaults::initial_watermark(),
            state_key: defaults::state_key(),
            full_scan: false,
            persist_retries: defaults::persist_retries(),
        }
    }
}

/// Observer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Print new notices to stdout
    #[serde(default = "defaults::enabled")]
    pub console: bool,

    /// Raise native desktop notifications
    #[serde(default)]
    pub desktop: bool,

    /// Outbound email webhook (`subject` and `body` query parameters)
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Subscription endpoint (`email` query parameter)
    #[serde(default = "defaults::subscribe_url")]
    pub subscribe_url: Option<String>,

    /// Subject line for webhook mails
    #[serde(default = "defaults::subject")]
    pub subject: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            console: defaults::enabled(),
            desktop: false,
            webhook_url: None,
            subscribe_url: defaults::subscribe_url(),
            subject: defaults::subject(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn proxy_url() -> Option<String> {
        Some("https://exp.sunnythedeveloper.in/scrapper.php".into())
    }
    pub fn page_url() -> String {
        "https://mmmut.ac.in/ExaminationSchedule".into()
    }
    pub fn base_url() -> String {
        "https://mmmut.ac.in/".into()
    }
    pub fn table_id() -> String {
        "ContentPlaceHolder2_ContentPlaceHolder3_GridView1".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Monitor defaults
    pub fn poll_interval() -> u64 {
        10_000
    }
    pub fn initial_watermark() -> u64 {
        crate::pipeline::DEFAULT_WATERMARK
    }
    pub fn state_key() -> String {
        "last_notice_number".into()
    }
    pub fn persist_retries() -> u32 {
        2
    }

    // Notify defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn subscribe_url() -> Option<String> {
        Some("https://monitor-server-mcb7.onrender.com/api/subscribe".into())
    }
    pub fn subject() -> String {
        "New MMMUT examination notice".into()
    }
}
