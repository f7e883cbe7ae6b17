// src/services/fetcher.rs

//! Page fetchers.
//!
//! The monitor only needs "URL in, HTML out". The university site blocks
//! cross-origin reads, so the usual path goes through a proxy that wraps the
//! page in a JSON envelope; [`DirectFetcher`] reads the page itself.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Config, CrawlerConfig, SourceMode};
use crate::utils::http::create_async_client;

/// Source of raw page HTML.
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    /// Fetch the page behind `url` and return its HTML.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Response shape of the fetch proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProxyEnvelope {
    /// Unwrap the page HTML, turning `success: false` into a fetch error.
    pub fn into_html(self, url: &str) -> Result<String> {
        if !self.success {
            let message = self
                .error
                .unwrap_or_else(|| "Failed to fetch data".to_string());
            return Err(AppError::fetch(url, message));
        }
        self.data
            .ok_or_else(|| AppError::fetch(url, "proxy reported success without data"))
    }

    /// Read the proxy's reply and unwrap the page HTML.
    ///
    /// The HTTP status is ignored; only the envelope decides.
    pub async fn from_response(url: &str, response: Response) -> Result<String> {
        let body = response.text().await?;
        let envelope: Self = serde_json::from_str(&body)?;
        envelope.into_html(url)
    }
}

/// Fetcher that goes through the JSON proxy.
///
/// The envelope is authoritative: a 500 carrying `success: true` is a
/// success, and a 200 carrying `success: false` is a failure.
pub struct ProxyFetcher {
    client: Client,
}

impl ProxyFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl HtmlFetcher for ProxyFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        ProxyEnvelope::from_response(url, response).await
    }
}

/// Fetcher that reads the examination page directly.
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl HtmlFetcher for DirectFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }
}

/// Build the fetcher selected by `[source].mode`.
pub fn fetcher_for(config: &Config) -> Result<Arc<dyn HtmlFetcher>> {
    Ok(match config.source.mode {
        SourceMode::Proxy => Arc::new(ProxyFetcher::new(&config.crawler)?),
        SourceMode::Direct => Arc::new(DirectFetcher::new(&config.crawler)?),
    })
}
