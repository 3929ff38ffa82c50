//! GitLab support, for gitlab.com and self-managed instances.
//!
//! # Module Structure
//!
//! - [`types`] - Commit types deserialized from the REST API
//! - `client` - [`GitLabPlatform`], the [`ForgePlatform`](crate::platform::ForgePlatform) implementation

mod client;
pub mod types;

pub use client::{GITLAB_HOST, GitLabPlatform};
pub use types::GitLabCommit;
