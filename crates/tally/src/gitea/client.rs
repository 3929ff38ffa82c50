//! Gitea specialization of the tally engine.

use async_trait::async_trait;

use super::types::GiteaCommit;
use crate::aggregate::TallyContext;
use crate::api::RequestOptions;
use crate::platform::{
    CommitMatcher, ForgePlatform, ListingConfig, ListingParams, Repo, count_matching,
    date_range_filters, join_url,
};
use crate::settings::Settings;

/// Default Codeberg host.
pub const CODEBERG_HOST: &str = "https://codeberg.org";

/// Default page size for API requests.
const PAGE_SIZE: usize = 50;

/// Gitea, Forgejo or Codeberg.
///
/// The repository listing has no ordering parameter, so it is always walked
/// to the end; the date range still applies to the commit listings.
#[derive(Debug, Clone)]
pub struct GiteaPlatform {
    host: String,
}

impl Default for GiteaPlatform {
    fn default() -> Self {
        Self::new(CODEBERG_HOST)
    }
}

impl GiteaPlatform {
    /// Create a platform for an instance, e.g. `https://git.example.com`.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request_options(&self, settings: &Settings) -> RequestOptions {
        RequestOptions::default().header("Authorization", format!("token {}", settings.access_token))
    }

    /// Listing of one repository's commits in the configured date range.
    pub fn commits_config(&self, settings: &Settings, full_name: &str) -> ListingConfig {
        let params = ListingParams::new(date_range_filters(settings))
            .filter("limit", PAGE_SIZE.to_string())
            .filter("stat", "false");

        ListingConfig::new(
            join_url(&self.host, &format!("api/v1/repos/{}/commits", full_name)),
            params,
        )
        .items_per_page(PAGE_SIZE)
        .request_options(self.request_options(settings))
    }
}

#[async_trait]
impl ForgePlatform for GiteaPlatform {
    fn name(&self) -> &'static str {
        "Gitea"
    }

    fn listing_config(&self, settings: &Settings) -> ListingConfig {
        let params = ListingParams::default().filter("limit", PAGE_SIZE.to_string());

        ListingConfig::new(join_url(&self.host, "api/v1/user/repos"), params)
            .items_per_page(PAGE_SIZE)
            .request_options(self.request_options(settings))
    }

    async fn count_commits(&self, ctx: &TallyContext, repo: &Repo) -> u64 {
        let Some(full_name) = repo.str_field("full_name") else {
            tracing::debug!("Skipping repository without full_name: {}", repo.display_name());
            return 0;
        };

        let settings = ctx.settings();
        let matcher = CommitMatcher::from_settings(settings);
        let listing = ctx.list_all(self.commits_config(settings, full_name)).await;

        count_matching(listing.items, |commit: &GiteaCommit| {
            matcher.matches(&commit.author_identity())
        })
    }
}
