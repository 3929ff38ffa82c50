//! Transport-level retry for forge API requests.
//!
//! The HTTP accessor never retries on its own; retries live here, below it,
//! as a decorator over any [`HttpTransport`]. Transient failures (network
//! errors, timeouts, 429 and 502/503/504 responses) are retried with
//! exponential backoff and jitter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};

use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Whether a response status is worth another attempt.
#[inline]
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Failure of a single attempt, as seen by the backoff loop.
#[derive(Debug)]
enum AttemptError {
    /// Retryable response; kept so it can be returned once retries run out.
    Status(HttpResponse),
    Http(HttpError),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Status(resp) => write!(f, "HTTP {}", resp.status),
            AttemptError::Http(e) => write!(f, "{e}"),
        }
    }
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Status(_) => true,
            AttemptError::Http(HttpError::Transport(_) | HttpError::Timeout(_)) => true,
            AttemptError::Http(HttpError::NoMockResponse { .. }) => false,
        }
    }
}

/// Retrying decorator around another transport.
///
/// A retryable status that survives every attempt is returned as a normal
/// response so the caller still sees the server's payload.
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn HttpTransport>,
    config: RetryConfig,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl HttpTransport for RetryingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let attempt = AtomicU32::new(0);
        let url = request.url.clone();

        let operation = || {
            attempt.fetch_add(1, Ordering::SeqCst);
            let request = request.clone();
            async move {
                match self.inner.send(request).await {
                    Ok(resp) if is_retryable_status(resp.status) => {
                        Err(AttemptError::Status(resp))
                    }
                    Ok(resp) => Ok(resp),
                    Err(e) => Err(AttemptError::Http(e)),
                }
            }
        };

        let result = operation
            .retry(self.config.clone().into_backoff())
            .notify(|err, dur| {
                tracing::debug!(
                    "Retrying {} in {:?} (attempt {}): {}",
                    url,
                    dur,
                    attempt.load(Ordering::SeqCst),
                    err
                );
            })
            .when(AttemptError::is_retryable)
            .await;

        match result {
            Ok(resp) => Ok(resp),
            Err(AttemptError::Status(resp)) => Ok(resp),
            Err(AttemptError::Http(e)) => Err(e),
        }
    }
}
