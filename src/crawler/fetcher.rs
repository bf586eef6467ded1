//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the shared HTTP client
//! - GET requests returning the raw document body
//! - Retry with exponential backoff on transient failures
//! - Error classification

use crate::config::HttpConfig;
use crate::crawler::retry::{ErrorKind, RetryDecision, RetryPolicy};
use reqwest::Client;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code of the last attempt
        status_code: u16,
        /// Number of attempts made
        attempts: u32,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description of the last attempt
        error: String,
        /// Number of attempts made
        attempts: u32,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Human-readable reason for a failed fetch, None on success
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::HttpError {
                status_code,
                attempts,
            } => Some(format!("HTTP {} after {} attempt(s)", status_code, attempts)),
            Self::NetworkError { error, attempts } => {
                Some(format!("{} after {} attempt(s)", error, attempts))
            }
        }
    }
}

/// Builds the HTTP client shared by page fetches and image downloads
///
/// # Arguments
///
/// * `config` - The page fetching configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use gallery_harvest::config::HttpConfig;
/// use gallery_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages with the retry policy applied
///
/// Cloning is cheap: the underlying client is reference-counted and shares
/// one connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    timeout: Duration,
}

enum AttemptError {
    Status(u16),
    Network(reqwest::Error),
}

impl Fetcher {
    pub fn new(client: Client, config: &HttpConfig) -> Self {
        Self {
            client,
            policy: RetryPolicy::from_config(config),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Fetches a document, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Status in `retry_statuses` | Retry with exponential backoff |
    /// | Timeout | Retry with exponential backoff |
    /// | Connection failure | Retry with exponential backoff |
    /// | Any other non-2xx status | Immediate → HttpError |
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// A FetchResult indicating success or the type of failure
    pub async fn fetch_document(&self, url: &str) -> FetchResult {
        let mut attempt = 1u32;

        loop {
            let error = match self.try_fetch(url).await {
                Ok((final_url, status_code, body)) => {
                    return FetchResult::Success {
                        final_url,
                        status_code,
                        body,
                    };
                }
                Err(error) => error,
            };

            let kind = match &error {
                AttemptError::Status(status) => self.policy.classify_status(*status),
                AttemptError::Network(e) => self.policy.classify_error(e),
            };

            match self.policy.decide(attempt, kind) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt,
                        url,
                        describe(&error, kind),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::NoRetry => {
                    return match error {
                        AttemptError::Status(status_code) => FetchResult::HttpError {
                            status_code,
                            attempts: attempt,
                        },
                        AttemptError::Network(_) => FetchResult::NetworkError {
                            error: describe(&error, kind),
                            attempts: attempt,
                        },
                    };
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<(String, u16, String), AttemptError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(AttemptError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(AttemptError::Network)?;

        Ok((final_url, status.as_u16(), body))
    }
}

fn describe(error: &AttemptError, kind: ErrorKind) -> String {
    match (error, kind) {
        (AttemptError::Status(status), _) => format!("HTTP {}", status),
        (AttemptError::Network(_), ErrorKind::Timeout) => "Request timeout".to_string(),
        (AttemptError::Network(_), ErrorKind::Connection) => "Connection failed".to_string(),
        (AttemptError::Network(e), _) => e.to_string(),
    }
}
