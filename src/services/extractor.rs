//! Client for the remote "URL -> clean text" extraction endpoint.
//!
//! The endpoint is a reader-style service: `GET {base}/{url}` returns the
//! page title and markdown body as JSON. Every request carries its own hard
//! timeout so one unresponsive URL cannot stall a whole crawl; retries and
//! backoff live here so callers only see final outcomes.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Hard timeout for a single page fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Total attempts per URL (first try plus two retries).
const MAX_ATTEMPTS: u32 = 3;

/// Rate-limit backoff: base 2s, doubling, capped at 30s.
const RATE_LIMIT_BACKOFF_BASE_MS: u64 = 2_000;
const RATE_LIMIT_BACKOFF_CAP_MS: u64 = 30_000;

/// Transport-failure backoff: 1s per attempt, capped at 5s.
const TRANSPORT_BACKOFF_STEP_MS: u64 = 1_000;
const TRANSPORT_BACKOFF_CAP_MS: u64 = 5_000;

/// Title and markdown body returned for one URL.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub content: String,
}

impl ExtractedPage {
    /// The page title, falling back to `fallback` (normally the source URL)
    /// when the endpoint returned none or an empty string.
    pub fn title_or(&self, fallback: &str) -> String {
        match &self.title {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// HTTP 429 after exhausting retries. Kept distinct so the scheduler
    /// can degrade concurrency on sustained rate limiting.
    #[error("extraction endpoint rate limited")]
    RateLimited,

    #[error("extraction endpoint returned HTTP {0}")]
    Status(u16),

    #[error("request to extraction endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("extraction endpoint returned a malformed body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Reader responses come in two shapes: `{ data: { title, content } }` or
/// the fields at the top level.
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    data: Option<ExtractPayload>,
    title: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractPayload {
    title: Option<String>,
    content: Option<String>,
}

impl ExtractResponse {
    fn into_page(self) -> ExtractedPage {
        match self.data {
            Some(payload) => ExtractedPage {
                title: payload.title.or(self.title),
                content: payload.content.or(self.content).unwrap_or_default(),
            },
            None => ExtractedPage {
                title: self.title,
                content: self.content.unwrap_or_default(),
            },
        }
    }
}

/// Client for the remote extraction endpoint.
pub struct ExtractorClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExtractorClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch one URL through the extraction endpoint with retries.
    ///
    /// A 429 waits out an exponential backoff before the next attempt; a
    /// transport failure (timeout, connection error) waits a linear one.
    /// Any other HTTP status or a malformed body is permanent and returned
    /// immediately. Exhausting retries surfaces the last error.
    pub async fn extract(&self, url: &str) -> Result<ExtractedPage, ExtractError> {
        let mut last_err: Option<ExtractError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.extract_once(url, FETCH_TIMEOUT).await {
                Ok(page) => return Ok(page),
                Err(ExtractError::RateLimited) => {
                    last_err = Some(ExtractError::RateLimited);
                    if attempt < MAX_ATTEMPTS {
                        let wait = rate_limit_backoff(attempt);
                        tracing::debug!(
                            url,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "rate limited, backing off"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(ExtractError::Transport(e)) => {
                    last_err = Some(ExtractError::Transport(e));
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(transport_backoff(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(ExtractError::RateLimited))
    }

    /// A single non-retried attempt. Discovery probes use this with a
    /// shorter timeout.
    pub async fn extract_once(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<ExtractedPage, ExtractError> {
        let endpoint = format!("{}/{}", self.base_url, url);

        let mut request = self
            .http
            .get(&endpoint)
            .header("Accept", "application/json")
            .header("X-Return-Format", "markdown")
            .timeout(timeout);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractError::RateLimited);
        }
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: ExtractResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_page())
    }
}

fn rate_limit_backoff(attempt: u32) -> Duration {
    let ms = RATE_LIMIT_BACKOFF_BASE_MS.saturating_mul(1u64 << (attempt - 1));
    Duration::from_millis(ms.min(RATE_LIMIT_BACKOFF_CAP_MS))
}

fn transport_backoff(attempt: u32) -> Duration {
    let ms = TRANSPORT_BACKOFF_STEP_MS * u64::from(attempt);
    Duration::from_millis(ms.min(TRANSPORT_BACKOFF_CAP_MS))
}
