//! Mailing-list subscription side channel.

use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::create_async_client;

/// Client for the subscription endpoint.
pub struct SubscriptionClient {
    client: Client,
    endpoint: Url,
}

impl SubscriptionClient {
    pub fn new(config: &CrawlerConfig, endpoint: &str) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// Request URL for subscribing `email`.
    pub fn request_url(&self, email: &str) -> Result<Url> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::validation(format!(
                "'{email}' is not an email address"
            )));
        }

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("email", email);
        Ok(url)
    }

    /// Subscribe `email` and return the server's plain-text reply.
    ///
    /// The reply is returned even for error statuses, since the server
    /// explains refusals in the body.
    pub async fn subscribe(&self, email: &str) -> Result<String> {
        let url = self.request_url(email)?;
        let reply = self.client.get(url).send().await?.text().await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SubscriptionClient {
        SubscriptionClient::new(
            &CrawlerConfig::default(),
            "https://monitor.example/api/subscribe",
        )
        .unwrap()
    }

    #[test]
    fn test_request_url() {
        let url = client().request_url(" student+exam@mmmut.ac.in ").unwrap();
        assert_eq!(
            url.as_str(),
            "https://monitor.example/api/subscribe?email=student%2Bexam%40mmmut.ac.in"
        );
    }

    #[test]
    fn test_rejects_non_address() {
        assert!(matches!(
            client().request_url("student"),
            Err(AppError::Validation(_))
        ));
        assert!(client().request_url("   ").is_err());
    }
}
