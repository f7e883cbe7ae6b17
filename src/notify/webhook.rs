//! Outbound email webhook.
//!
//! The mail relay takes a GET with `subject` and an HTML `body` in the query
//! string and answers with a plain-text status line.

use reqwest::Client;
use tokio::runtime::Handle;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Notice};
use crate::pipeline::NoticeObserver;
use crate::utils::http::create_async_client;

/// Observer that mails new notices through the webhook.
///
/// Deliveries are spawned on the runtime the webhook was created on; the
/// poll that found the notices does not wait for them.
#[derive(Clone)]
pub struct EmailWebhook {
    client: Client,
    endpoint: Url,
    subject: String,
    runtime: Handle,
}

impl EmailWebhook {
    /// Create a webhook observer. Must be called inside a tokio runtime.
    pub fn new(config: &CrawlerConfig, endpoint: &str, subject: impl Into<String>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| AppError::config(format!("email webhook needs a tokio runtime: {e}")))?;
        Ok(Self {
            client: create_async_client(config)?,
            endpoint: Url::parse(endpoint)?,
            subject: subject.into(),
            runtime,
        })
    }

    /// Request URL for a batch of notices.
    pub fn request_url(&self, notices: &[Notice]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("subject", &self.subject)
            .append_pair("body", &render_html(notices));
        url
    }

    /// Deliver a batch and return the relay's reply.
    pub async fn send(&self, notices: &[Notice]) -> Result<String> {
        let reply = self
            .client
            .get(self.request_url(notices))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(reply)
    }
}

impl NoticeObserver for EmailWebhook {
    fn on_new_notices(&self, notices: &[Notice]) {
        let webhook = self.clone();
        let notices = notices.to_vec();
        self.runtime.spawn(async move {
            match webhook.send(&notices).await {
                Ok(reply) => log::info!("Email webhook: {}", reply.trim()),
                Err(e) => log::error!("Email webhook failed: {}", e),
            }
        });
    }
}

/// HTML mail body listing the notices with links.
pub fn render_html(notices: &[Notice]) -> String {
    let mut html = String::from("<h3>New examination notices</h3><ul>");
    for notice in notices {
        let title = html_escape::encode_text(&notice.title);
        match notice.link.as_deref() {
            Some(link) => html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>",
                html_escape::encode_double_quoted_attribute(link),
                title
            )),
            None => html.push_str(&format!("<li>{title}</li>")),
        }
    }
    html.push_str("</ul>");
    html
}
