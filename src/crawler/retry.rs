//! Retry policy for page fetches
//!
//! Classifies failed attempts and decides whether, and after how long, the
//! request is tried again.

use crate::config::HttpConfig;
use std::time::Duration;

/// Classification of a failed attempt for retry purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request timed out (connect or read)
    Timeout,
    /// Connection could not be established or was reset
    Connection,
    /// HTTP status listed as retryable
    RetryableStatus(u16),
    /// Any other failure; not retried
    Other,
}

/// Decision returned by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and report the failure
    NoRetry,
    /// Try again after the given delay
    RetryAfter(Duration),
}

/// Exponential backoff policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt
    pub base_delay: Duration,
    /// Upper bound on a single delay
    pub max_delay: Duration,
    /// Status codes worth another attempt
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    /// Classifies an HTTP status code
    pub fn classify_status(&self, status: u16) -> ErrorKind {
        if self.retry_statuses.contains(&status) {
            ErrorKind::RetryableStatus(status)
        } else {
            ErrorKind::Other
        }
    }

    /// Classifies a transport-level error
    pub fn classify_error(&self, error: &reqwest::Error) -> ErrorKind {
        if error.is_timeout() {
            ErrorKind::Timeout
        } else if error.is_connect() || error.is_request() {
            ErrorKind::Connection
        } else if let Some(status) = error.status() {
            self.classify_status(status.as_u16())
        } else {
            ErrorKind::Other
        }
    }

    /// Decides what to do after attempt number `attempt` (1-based) failed
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::RetryableStatus(_) => {
                // base * 2^(attempt-1), capped
                let exp = 1u32 << attempt.saturating_sub(1).min(16);
                let delay = self.base_delay.saturating_mul(exp).min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}
