//! Tally - commit and project counts across a code forge.
//!
//! This library counts how many commits a user made, and in how many
//! repositories ("projects"), across every repository visible to them on
//! GitHub, GitLab or a Gitea-based forge, within an optional date range.
//!
//! # Features
//!
//! - `github`, `gitlab`, `gitea` - Platform specializations (all on by default).
//!
//! # Example
//!
//! ```ignore
//! use tally::{Settings, Tally};
//! use tally::github::GitHubPlatform;
//!
//! let settings = Settings::resolve(&serde_json::json!({
//!     "username": "octocat",
//!     "access_token": token,
//!     "from_date": "2024-01-01",
//! }));
//!
//! let totals = Tally::new(GitHubPlatform::default(), settings)?.get().await;
//! println!("{} commits in {} projects", totals.commits, totals.projects);
//! ```

pub mod aggregate;
pub mod api;
pub mod http;
pub mod platform;
pub mod retry;
pub mod settings;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "gitlab")]
pub mod gitlab;

#[cfg(feature = "gitea")]
pub mod gitea;

pub use aggregate::{
    ActivityTotals, Listing, ListingEnd, ProgressCallback, Tally, TallyContext, TallyProgress,
};
pub use api::{ApiClient, ApiOutcome, RequestOptions};
pub use platform::{ApiError, ApiRateLimiter, ForgePlatform, Repo, TallyError, rate_limits};
pub use settings::Settings;
