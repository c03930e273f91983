//! Shared REST client for exchange capabilities.
//!
//! Wraps a single `reqwest::Client` (connection pool, gzip decoding) and
//! stamps every request with a randomly chosen browser `User-Agent`.

use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use reqwest::StatusCode;
use scrape_core::ScrapeError;
use tracing::trace;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Cheaply cloneable HTTP client.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    /// Wrap a preconfigured client (timeouts, proxy settings).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn user_agent() -> &'static str {
        USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
    }

    /// `GET url?query` and return the body.
    ///
    /// Non-200 responses become [`ScrapeError::Http`] carrying the body.
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::USER_AGENT, Self::user_agent())
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = resp.status();
        let body = resp.text().await.with_context(|| format!("read body of {url}"))?;
        trace!(url, %status, len = body.len(), "http response");

        if status != StatusCode::OK {
            return Err(ScrapeError::Http(format!("{url}: status {status}, body: {body}")).into());
        }
        Ok(body)
    }
}
