//! Platform-agnostic strategy for code forges.
//!
//! This module defines the [`ForgePlatform`] trait that the tally engine is
//! specialized with, along with the listing description it consumes, the
//! error types of the HTTP accessor and a shared request rate limiter.
//!
//! # Example
//!
//! ```ignore
//! use tally::platform::{ForgePlatform, ListingConfig, ListingParams, Repo};
//!
//! struct SelfHosted;
//!
//! #[async_trait::async_trait]
//! impl ForgePlatform for SelfHosted {
//!     fn name(&self) -> &'static str {
//!         "forge"
//!     }
//!
//!     fn listing_config(&self, _settings: &Settings) -> ListingConfig {
//!         ListingConfig::new("https://forge.example/api/repos", ListingParams::default())
//!             .updated_field("updated_at")
//!     }
//! }
//! ```

mod errors;
mod matcher;
mod rate_limit;
mod types;

pub use errors::{ApiError, Result, TallyError, short_error_message};
pub use matcher::{CommitAuthor, CommitMatcher, count_matching};
pub use rate_limit::{ApiRateLimiter, rate_limits};
pub use types::{DEFAULT_ITEMS_PER_PAGE, ForgePlatform, ListingConfig, ListingParams, Repo};

use chrono::SecondsFormat;

use crate::settings::Settings;

/// Join a host and an API path, tolerating a trailing slash on the host.
pub fn join_url(host: &str, path: &str) -> String {
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `since` / `until` query filters for the configured date range.
///
/// Unset or unparseable bounds are left out.
pub fn date_range_filters(settings: &Settings) -> Vec<(String, String)> {
    [("since", settings.from_bound()), ("until", settings.until_bound())]
        .into_iter()
        .filter_map(|(key, bound)| {
            bound.map(|dt| (key.to_string(), dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
        })
        .collect()
}
