//! GitHub support.
//!
//! # Module Structure
//!
//! - [`types`] - Commit types deserialized from the REST API
//! - `client` - [`GitHubPlatform`], the [`ForgePlatform`](crate::platform::ForgePlatform) implementation
//!
//! ```ignore
//! use tally::aggregate::Tally;
//! use tally::github::GitHubPlatform;
//!
//! let totals = Tally::new(GitHubPlatform::default(), settings)?.get().await;
//! ```

mod client;
pub mod types;

pub use client::{GITHUB_API_HOST, GitHubPlatform};
pub use types::{GitHubAccount, GitHubCommit, GitHubCommitDetail, GitHubSignature};
