//! GitLab specialization of the tally engine.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::types::GitLabCommit;
use crate::aggregate::{TallyContext, TallyProgress};
use crate::api::RequestOptions;
use crate::platform::{
    CommitMatcher, ForgePlatform, ListingConfig, ListingParams, Repo, count_matching,
    date_range_filters, join_url,
};
use crate::settings::Settings;

/// Default GitLab host.
pub const GITLAB_HOST: &str = "https://gitlab.com";

/// GitLab's maximum page size.
const PAGE_SIZE: usize = 100;

/// Fields of `GET /user` holding addresses the user commits with.
const ACCOUNT_EMAIL_FIELDS: [&str; 3] = ["commit_email", "email", "public_email"];

/// gitlab.com or a self-managed GitLab instance.
///
/// Projects are listed by last activity, newest first, so the lower date
/// bound can stop the listing early. GitLab rejects basic authentication
/// for API tokens; requests carry the token as a bearer token instead.
///
/// GitLab commits carry no account login. Without configured e-mails or
/// names, commits are matched against the e-mail addresses of the token's
/// account, looked up once per platform.
#[derive(Debug, Clone)]
pub struct GitLabPlatform {
    host: String,
    account_emails: OnceCell<Vec<String>>,
}

impl Default for GitLabPlatform {
    fn default() -> Self {
        Self::new(GITLAB_HOST)
    }
}

impl GitLabPlatform {
    /// Create a platform for an instance, e.g. `https://gitlab.example.com`.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            account_emails: OnceCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request_options(&self, settings: &Settings) -> RequestOptions {
        RequestOptions::default().header(
            "Authorization",
            format!("Bearer {}", settings.access_token),
        )
    }

    /// Listing of one project's commits on every branch.
    pub fn commits_config(&self, settings: &Settings, project_id: u64) -> ListingConfig {
        let params = ListingParams::new(date_range_filters(settings))
            .filter("all", "true")
            .filter("per_page", PAGE_SIZE.to_string());

        ListingConfig::new(
            join_url(
                &self.host,
                &format!("api/v4/projects/{}/repository/commits", project_id),
            ),
            params,
        )
        .items_per_page(PAGE_SIZE)
        .request_options(self.request_options(settings))
    }

    /// E-mail addresses of the authenticated account.
    ///
    /// Empty when the lookup fails or the account exposes none.
    async fn account_emails(&self, ctx: &TallyContext) -> &[String] {
        self.account_emails
            .get_or_init(|| async {
                let options = self.request_options(ctx.settings());
                let endpoint = join_url(&self.host, "api/v4/user");
                let user = ctx
                    .api()
                    .get_from_api(&endpoint, &[], &options)
                    .await
                    .into_data()
                    .unwrap_or(Value::Null);

                let mut emails: Vec<String> = Vec::new();
                for field in ACCOUNT_EMAIL_FIELDS {
                    if let Some(email) = user.get(field).and_then(Value::as_str)
                        && !email.trim().is_empty()
                        && !emails.iter().any(|e| e.eq_ignore_ascii_case(email))
                    {
                        emails.push(email.to_string());
                    }
                }

                if emails.is_empty() {
                    ctx.emit(TallyProgress::Warning {
                        message: "No e-mail address found for the GitLab account; \
                                  configure emails or names to count commits"
                            .to_string(),
                    });
                }
                emails
            })
            .await
    }

    async fn matcher(&self, ctx: &TallyContext) -> CommitMatcher {
        let matcher = CommitMatcher::from_settings(ctx.settings());
        if matcher.has_identity_filters() {
            return matcher;
        }
        matcher.with_emails(self.account_emails(ctx).await)
    }
}

#[async_trait]
impl ForgePlatform for GitLabPlatform {
    fn name(&self) -> &'static str {
        "GitLab"
    }

    fn listing_config(&self, settings: &Settings) -> ListingConfig {
        let params = ListingParams::default()
            .filter("membership", "true")
            .filter("order_by", "last_activity_at")
            .filter("sort", "desc")
            .filter("per_page", PAGE_SIZE.to_string());

        ListingConfig::new(join_url(&self.host, "api/v4/projects"), params)
            .updated_field("last_activity_at")
            .items_per_page(PAGE_SIZE)
            .request_options(self.request_options(settings))
    }

    async fn count_commits(&self, ctx: &TallyContext, repo: &Repo) -> u64 {
        let Some(project_id) = repo.field("id").and_then(Value::as_u64) else {
            tracing::debug!("Skipping project without id: {}", repo.display_name());
            return 0;
        };

        let matcher = self.matcher(ctx).await;
        if !matcher.has_identity_filters() {
            return 0;
        }

        let listing = ctx
            .list_all(self.commits_config(ctx.settings(), project_id))
            .await;
        count_matching(listing.items, |commit: &GitLabCommit| {
            matcher.matches_any(&commit.identities())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::aggregate::{ActivityTotals, Tally};
    use crate::api::ApiClient;
    use crate::http::{MockTransport, header_get};

    fn url(endpoint: &str, params: &[(&str, &str)]) -> String {
        Url::parse_with_params(endpoint, params)
            .expect("valid test url")
            .to_string()
    }

    fn settings() -> Settings {
        Settings {
            username: "tanuki".to_string(),
            access_token: "glpat-test".to_string(),
            emails: vec!["tanuki@example.com".to_string()],
            ..Settings::default()
        }
    }

    fn context(mock: &MockTransport, settings: Settings) -> TallyContext {
        let api = ApiClient::new_with_transport(&settings, Arc::new(mock.clone()));
        TallyContext::new(api, settings)
    }

    fn commit(author_email: &str, committer_email: &str) -> serde_json::Value {
        json!({
            "id": "ed899a2f",
            "author_name": "Someone",
            "author_email": author_email,
            "committer_name": "Someone",
            "committer_email": committer_email,
        })
    }

    #[test]
    fn test_listing_config_orders_by_activity() {
        let config = GitLabPlatform::default().listing_config(&settings());

        assert_eq!(config.endpoint, "https://gitlab.com/api/v4/projects");
        assert_eq!(config.updated_field.as_deref(), Some("last_activity_at"));
        assert_eq!(
            config.params.filters,
            vec![
                ("membership".to_string(), "true".to_string()),
                ("order_by".to_string(), "last_activity_at".to_string()),
                ("sort".to_string(), "desc".to_string()),
                ("per_page".to_string(), "100".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_requests_use_bearer_token() {
        let mock = MockTransport::new();
        let listing_url = url(
            "https://gitlab.example.com/api/v4/projects",
            &[
                ("membership", "true"),
                ("order_by", "last_activity_at"),
                ("sort", "desc"),
                ("per_page", "100"),
                ("page", "1"),
            ],
        );
        mock.push_json(listing_url, &json!([]));
        let ctx = context(&mock, settings());
        let platform = GitLabPlatform::new("https://gitlab.example.com/");

        let _ = ctx.list_pages(platform.listing_config(&settings()), None).await;

        let request = &mock.requests()[0];
        assert_eq!(
            header_get(&request.headers, "authorization"),
            Some("Bearer glpat-test")
        );
    }

    #[tokio::test]
    async fn test_count_commits_matches_author_or_committer_email() {
        let mock = MockTransport::new();
        let settings = Settings {
            from_date: "2024-01-01".to_string(),
            until_date: "2024-12-31".to_string(),
            ..settings()
        };
        mock.push_json(
            url(
                "https://gitlab.com/api/v4/projects/42/repository/commits",
                &[
                    ("since", "2024-01-01T00:00:00Z"),
                    ("until", "2024-12-31T00:00:00Z"),
                    ("all", "true"),
                    ("per_page", "100"),
                    ("page", "1"),
                ],
            ),
            &json!([
                commit("tanuki@example.com", "tanuki@example.com"),
                commit("bot@example.com", "Tanuki@Example.com"),
                commit("bot@example.com", "bot@example.com"),
            ]),
        );
        let ctx = context(&mock, settings);
        let repo = Repo::new(json!({"id": 42, "path_with_namespace": "group/proj"}));

        let count = GitLabPlatform::default().count_commits(&ctx, &repo).await;

        assert_eq!(count, 2);
    }

    fn commits_url(project_id: u64) -> String {
        url(
            &format!("https://gitlab.com/api/v4/projects/{project_id}/repository/commits"),
            &[("all", "true"), ("per_page", "100"), ("page", "1")],
        )
    }

    fn user_url() -> String {
        url("https://gitlab.com/api/v4/user", &[])
    }

    #[tokio::test]
    async fn test_without_identities_matches_account_emails_locally() {
        let mock = MockTransport::new();
        let settings = Settings {
            username: "jo".to_string(),
            emails: Vec::new(),
            ..settings()
        };
        mock.push_json(
            user_url(),
            &json!({
                "username": "jo",
                "email": "Jane@Corp.example",
                "commit_email": "jane@corp.example",
                "public_email": ""
            }),
        );
        mock.push_json(
            commits_url(7),
            &json!([
                commit("jane@corp.example", "jane@corp.example"),
                commit("jones@corp.example", "jones@corp.example"),
                {"id": "1", "author_name": "John", "author_email": "john@corp.example",
                 "committer_name": "John", "committer_email": "john@corp.example"},
            ]),
        );
        mock.push_json(
            commits_url(8),
            &json!([commit("bot@corp.example", "JANE@corp.example")]),
        );
        let ctx = context(&mock, settings);
        let platform = GitLabPlatform::default();

        let first = platform
            .count_commits(&ctx, &Repo::new(json!({"id": 7})))
            .await;
        let second = platform
            .count_commits(&ctx, &Repo::new(json!({"id": 8})))
            .await;

        assert_eq!((first, second), (1, 1));
        let urls = mock.requested_urls();
        assert_eq!(urls.iter().filter(|u| **u == user_url()).count(), 1);
        assert!(urls.iter().all(|u| !u.contains("author=")));
    }

    #[tokio::test]
    async fn test_configured_emails_skip_the_account_lookup() {
        let mock = MockTransport::new();
        mock.push_json(commits_url(9), &json!([commit("tanuki@example.com", "x@x")]));
        let ctx = context(&mock, settings());

        let count = GitLabPlatform::default()
            .count_commits(&ctx, &Repo::new(json!({"id": 9})))
            .await;

        assert_eq!(count, 1);
        assert_eq!(mock.requested_urls(), vec![commits_url(9)]);
    }

    #[tokio::test]
    async fn test_account_without_emails_counts_nothing_and_warns() {
        let mock = MockTransport::new();
        mock.push_json(user_url(), &json!({"username": "jo", "public_email": ""}));
        let warnings = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&warnings);
        let callback: crate::aggregate::ProgressCallback = Box::new(move |event| {
            if let TallyProgress::Warning { message } = event {
                seen.lock().unwrap().push(message);
            }
        });
        let settings = Settings {
            emails: Vec::new(),
            ..settings()
        };
        let ctx = context(&mock, settings).with_progress(Arc::new(callback));

        let count = GitLabPlatform::default()
            .count_commits(&ctx, &Repo::new(json!({"id": 3})))
            .await;

        assert_eq!(count, 0);
        assert_eq!(warnings.lock().unwrap().len(), 1);
        assert_eq!(mock.requested_urls(), vec![user_url()]);
    }

    #[tokio::test]
    async fn test_full_tally_across_pages() {
        let mock = MockTransport::new();
        let projects_url = |page: &str| {
            url(
                "https://gitlab.com/api/v4/projects",
                &[
                    ("membership", "true"),
                    ("order_by", "last_activity_at"),
                    ("sort", "desc"),
                    ("per_page", "100"),
                    ("page", page),
                ],
            )
        };
        let first: Vec<serde_json::Value> = (1..=100)
            .map(|id| json!({"id": id, "last_activity_at": "2024-06-01T00:00:00Z"}))
            .collect();
        mock.push_json(projects_url("1"), &serde_json::Value::Array(first));
        mock.push_json(
            projects_url("2"),
            &json!([{"id": 101, "last_activity_at": "2024-05-01T00:00:00Z"}]),
        );
        for id in 1..=101u64 {
            let commits = if id == 101 {
                json!([
                    commit("tanuki@example.com", "x@x"),
                    commit("tanuki@example.com", "x@x"),
                ])
            } else {
                json!([])
            };
            mock.push_json(
                url(
                    &format!("https://gitlab.com/api/v4/projects/{id}/repository/commits"),
                    &[("all", "true"), ("per_page", "100"), ("page", "1")],
                ),
                &commits,
            );
        }

        let settings = settings();
        let api = ApiClient::new_with_transport(&settings, Arc::new(mock.clone()));
        let totals = Tally::with_client(GitLabPlatform::default(), settings, api)
            .get()
            .await;

        assert_eq!(totals, ActivityTotals { projects: 1, commits: 2 });
    }
}
