//! Bounded retry and timeout policy for external calls
//!
//! The policy is deliberately small: every attempt is bounded by a timeout,
//! and only errors matching `retry_on` (by default the transient signal) are
//! retried, after a single fixed backoff. Timeouts and hard failures are
//! returned as-is.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Normalized failure of an external call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The service explicitly asked to try again shortly (e.g. model warming up)
    #[error("Service temporarily unavailable: {0}")]
    Transient(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("External service error: {0}")]
    External(String),

    /// A retryable error persisted through every allowed attempt
    #[error("Service still unavailable after {attempts} attempt(s): {message}")]
    Exhausted { attempts: u32, message: String },
}

impl CallError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transient(_))
    }

    pub fn external(message: impl Into<String>) -> Self {
        CallError::External(message.into())
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallError::External(format!("request timed out: {}", err))
        } else {
            CallError::External(format!("request failed: {}", err))
        }
    }
}

/// Retry/timeout decorator for a single external capability
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed wait before each retry
    pub backoff: Duration,
    /// Bound on every individual attempt
    pub timeout: Duration,
    /// Which errors deserve another attempt
    pub retry_on: fn(&CallError) -> bool,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

    /// Retry once on the transient signal
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            backoff,
            timeout,
            retry_on: CallError::is_transient,
        }
    }

    /// Timeout only, a single attempt
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            timeout,
            retry_on: CallError::is_transient,
        }
    }

    pub fn with_retry_on(mut self, retry_on: fn(&CallError) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Runs `call` under this policy
    ///
    /// `call` is invoked once per attempt so each retry re-issues the request.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} attempt {}/{}", operation, attempt, self.max_attempts);

            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CallError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded after {} attempt(s)", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if (self.retry_on)(&err) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            "{} still failing after {} attempt(s): {}",
                            operation, attempt, err
                        );
                        return Err(CallError::Exhausted {
                            attempts: attempt,
                            message: err.to_string(),
                        });
                    }

                    warn!(
                        "{} attempt {}/{} failed with retryable error: {}. Retrying in {:?}",
                        operation, attempt, self.max_attempts, err, self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
