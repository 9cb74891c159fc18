//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - The `Transport` seam over a single GET
//! - Retrying every failure with capped exponential backoff
//!
//! Network errors, body read errors and non-2xx statuses are all the same
//! retryable failure class.

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::backoff::BackoffPolicy;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Document {
    /// The requested URL
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Page body content
    pub body: String,

    /// Attempts it took, including the successful one
    pub attempts: u32,
}

/// Raw response returned by a transport
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// A single failed GET
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read body from {url}: {message}")]
    Body { url: String, message: String },
}

/// Fetch failures surfaced to callers
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("gave up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: TransportError,
    },
}

/// One GET, no retries
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Per-request timeout
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(
        user_agent: &UserAgentConfig,
        fetcher: &FetcherConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, fetcher.timeout())?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            // Classify error
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            TransportError::Network {
                url: url.to_string(),
                message,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| TransportError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Retrying page fetcher
///
/// With the default policy a fetch retries until it succeeds; only the delay
/// between attempts is capped.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: BackoffPolicy) -> Self {
        Self { transport, policy }
    }

    /// Builds an HTTP fetcher from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        config: &FetcherConfig,
    ) -> Result<Self, reqwest::Error> {
        let transport = HttpTransport::from_config(user_agent, config)?;
        Ok(Self::new(
            Arc::new(transport),
            BackoffPolicy::from_config(config),
        ))
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Fetches `url`, retrying failures per the backoff policy
    pub async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let mut backoff = self.policy.schedule();

        loop {
            let attempt = backoff.attempts() + 1;
            tracing::debug!("GET {} (attempt {})", url, attempt);

            let error = match self.transport.get(url).await {
                Ok(response) => {
                    tracing::debug!("GET {} -> {}", url, response.status);
                    return Ok(Document {
                        url: url.to_string(),
                        status: response.status,
                        body: response.body,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            match backoff.next_delay() {
                Some(delay) => {
                    tracing::warn!("{}; retrying in {:?}", error, delay);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!("{}; giving up after {} attempts", error, attempt);
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_error: error,
                    });
                }
            }
        }
    }
}
