use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request rates per platform (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour = ~1.4/sec, we use 10/sec to allow bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// GitLab: 2000 requests/minute = ~33/sec, we use 5/sec for safety.
    pub const GITLAB_DEFAULT_RPS: u32 = 5;
    /// Gitea/Codeberg: varies by instance, conservative default.
    pub const GITEA_DEFAULT_RPS: u32 = 5;
}

/// A shared API rate limiter using the governor crate.
///
/// Clones share one bucket, so every task issuing requests through the same
/// [`ApiClient`](crate::api::ApiClient) is paced together.
///
/// # Example
///
/// ```ignore
/// use tally::platform::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    requests_per_second: u32,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A rate of zero is clamped to one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
            requests_per_second: rps.get(),
        }
    }

    /// Build a limiter from a settings value, where zero disables limiting.
    pub fn from_setting(requests_per_second: u64) -> Option<Self> {
        match u32::try_from(requests_per_second) {
            Ok(0) => None,
            Ok(rps) => Some(Self::new(rps)),
            Err(_) => Some(Self::new(u32::MAX)),
        }
    }

    /// The configured rate.
    #[inline]
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_rate_limits_constants() {
        assert_eq!(rate_limits::GITHUB_DEFAULT_RPS, 10);
        assert_eq!(rate_limits::GITLAB_DEFAULT_RPS, 5);
        assert_eq!(rate_limits::GITEA_DEFAULT_RPS, 5);
    }

    #[test]
    fn test_zero_rps_is_clamped() {
        assert_eq!(ApiRateLimiter::new(0).requests_per_second(), 1);
    }

    #[test]
    fn test_from_setting() {
        assert!(ApiRateLimiter::from_setting(0).is_none());
        assert_eq!(
            ApiRateLimiter::from_setting(7).map(|l| l.requests_per_second()),
            Some(7)
        );
        assert_eq!(
            ApiRateLimiter::from_setting(u64::MAX).map(|l| l.requests_per_second()),
            Some(u32::MAX)
        );
    }

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let limiter = ApiRateLimiter::new(100);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_clones_share_one_bucket() {
        let limiter = ApiRateLimiter::new(1);
        let clone = limiter.clone();
        let start = Instant::now();

        limiter.wait().await;
        clone.wait().await;

        // The second permit comes from the same bucket, so it is paced.
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
