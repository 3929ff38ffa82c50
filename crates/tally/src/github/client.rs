//! GitHub specialization of the tally engine.

use async_trait::async_trait;

use super::types::GitHubCommit;
use crate::aggregate::TallyContext;
use crate::api::RequestOptions;
use crate::platform::{
    CommitMatcher, ForgePlatform, ListingConfig, ListingParams, Repo, count_matching,
    date_range_filters, join_url,
};
use crate::settings::Settings;

/// Default GitHub API host.
pub const GITHUB_API_HOST: &str = "https://api.github.com";

/// GitHub's maximum page size.
const PAGE_SIZE: usize = 100;

/// Media type recommended by the GitHub REST API.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// GitHub, or a GitHub Enterprise Server API host.
///
/// Repositories are listed most recently pushed first, so the lower date
/// bound can stop the listing early.
#[derive(Debug, Clone)]
pub struct GitHubPlatform {
    host: String,
}

impl Default for GitHubPlatform {
    fn default() -> Self {
        Self::new(GITHUB_API_HOST)
    }
}

impl GitHubPlatform {
    /// Create a platform for an API host, e.g. `https://ghe.example.com/api/v3`.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions::default()
            .header("Accept", GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Listing of one repository's commits in the configured date range.
    ///
    /// With `author` set, GitHub filters the commits server-side.
    pub fn commits_config(
        &self,
        settings: &Settings,
        full_name: &str,
        author: Option<&str>,
    ) -> ListingConfig {
        let mut params = ListingParams::new(date_range_filters(settings));
        if let Some(author) = author {
            params = params.filter("author", author);
        }
        params = params.filter("per_page", PAGE_SIZE.to_string());

        ListingConfig::new(
            join_url(&self.host, &format!("repos/{}/commits", full_name)),
            params,
        )
        .items_per_page(PAGE_SIZE)
        .request_options(self.request_options())
    }
}

#[async_trait]
impl ForgePlatform for GitHubPlatform {
    fn name(&self) -> &'static str {
        "GitHub"
    }

    fn listing_config(&self, _settings: &Settings) -> ListingConfig {
        let params = ListingParams::default()
            .filter("affiliation", "owner,collaborator,organization_member")
            .filter("sort", "pushed")
            .filter("direction", "desc")
            .filter("per_page", PAGE_SIZE.to_string());

        ListingConfig::new(join_url(&self.host, "user/repos"), params)
            .updated_field("pushed_at")
            .items_per_page(PAGE_SIZE)
            .request_options(self.request_options())
    }

    async fn count_commits(&self, ctx: &TallyContext, repo: &Repo) -> u64 {
        let Some(full_name) = repo.str_field("full_name") else {
            tracing::debug!("Skipping repository without full_name: {}", repo.display_name());
            return 0;
        };

        let settings = ctx.settings();
        let matcher = CommitMatcher::from_settings(settings);
        let username = settings.username.trim();

        // Without e-mails or names the login is the only identity, and
        // GitHub can match it server-side.
        if !matcher.has_identity_filters() && !username.is_empty() {
            let config = self.commits_config(settings, full_name, Some(username));
            return ctx.list_all(config).await.len() as u64;
        }

        let config = self.commits_config(settings, full_name, None);
        let listing = ctx.list_all(config).await;
        count_matching(listing.items, |commit: &GitHubCommit| {
            matcher.matches(&commit.author_identity())
        })
    }
}
