//! Page fetching over HTTP.
//!
//! The crawl drivers only see the `PageFetcher` trait; tests substitute a
//! canned fetcher and never touch the network.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Settings;

/// A fetched page: the final URL and its body text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub text: String,
}

/// Errors from the fetch layer.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// Source of raw page text for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// HTTP-backed fetcher with per-request pacing.
pub struct HttpFetcher {
    client: reqwest::Client,
    delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from settings.
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout))
            .cookie_store(true)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            delay: Duration::from_millis(settings.request_delay_ms),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        // Pace requests so the portal doesn't rate-limit the crawl.
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let text = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            text,
        })
    }
}
