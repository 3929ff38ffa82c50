//! Gitea support, for Codeberg, Forgejo and self-hosted Gitea instances.
//!
//! # Module Structure
//!
//! - [`types`] - Commit types deserialized from the REST API
//! - `client` - [`GiteaPlatform`], the [`ForgePlatform`](crate::platform::ForgePlatform) implementation

mod client;
pub mod types;

pub use client::{CODEBERG_HOST, GiteaPlatform};
pub use types::GiteaCommit;
