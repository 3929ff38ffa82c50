use async_trait::async_trait;
use serde_json::Value;

use crate::aggregate::TallyContext;
use crate::api::RequestOptions;
use crate::settings::Settings;

/// Default page size of a listing endpoint.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 100;

/// A repository record from a platform listing.
///
/// The engine only ever reads a date field from it; everything else is
/// left to the platform that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Repo(Value);

impl Repo {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a field by key, or by JSON pointer when `name` starts with `/`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        Self::lookup(&self.0, name)
    }

    /// [`Repo::field`] on a raw record.
    pub fn lookup<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
        if name.starts_with('/') {
            record.pointer(name)
        } else {
            record.get(name)
        }
    }

    /// A field as a string, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Human-readable name for logs and progress output.
    pub fn display_name(&self) -> String {
        ["full_name", "path_with_namespace", "name"]
            .iter()
            .find_map(|key| self.str_field(key))
            .map(str::to_string)
            .or_else(|| self.field("id").map(Value::to_string))
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

impl From<Value> for Repo {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Query parameters of a listing: the page counter plus fixed filters.
///
/// The page counter is the only thing the lister ever changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingParams {
    /// Query parameter carrying the page number.
    pub page_param: String,
    /// Current page, starting at the platform's first-page index.
    pub page: u64,
    pub filters: Vec<(String, String)>,
}

impl ListingParams {
    /// Params starting at page 1 with the usual `page` parameter.
    pub fn new(filters: Vec<(String, String)>) -> Self {
        Self {
            page_param: "page".to_string(),
            page: 1,
            filters,
        }
    }

    /// Builder: add a filter.
    #[must_use]
    pub fn filter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.filters.push((key.to_string(), value.into()));
        self
    }

    /// Filters in insertion order, followed by the page parameter.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = self.filters.clone();
        query.push((self.page_param.clone(), self.page.to_string()));
        query
    }
}

impl Default for ListingParams {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Everything the lister needs to walk one endpoint.
#[derive(Debug, Clone)]
pub struct ListingConfig {
    /// Absolute URL of the listing endpoint.
    pub endpoint: String,
    pub params: ListingParams,
    /// Field read from the last item of a page for early termination.
    ///
    /// Only set this when the endpoint is queried so that it returns items
    /// in descending order of this field: once the last item of a page is
    /// older than the lower date bound, every later page is assumed older
    /// too and is never fetched. `None` walks every page.
    pub updated_field: Option<String>,
    /// A page this long means more pages may follow.
    pub items_per_page: usize,
    /// JSON pointer to the item array when the body wraps it in an object.
    pub items_pointer: Option<String>,
    /// Per-request overrides (auth scheme, accept header, timeout).
    pub request_options: RequestOptions,
}

impl ListingConfig {
    pub fn new(endpoint: impl Into<String>, params: ListingParams) -> Self {
        Self {
            endpoint: endpoint.into(),
            params,
            updated_field: None,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            items_pointer: None,
            request_options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn updated_field(mut self, field: impl Into<String>) -> Self {
        self.updated_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn items_per_page(mut self, items_per_page: usize) -> Self {
        self.items_per_page = items_per_page;
        self
    }

    #[must_use]
    pub fn items_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.items_pointer = Some(pointer.into());
        self
    }

    #[must_use]
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }
}

/// Per-platform strategy plugged into the generic tally engine.
///
/// A platform says where its repositories are listed and how many of a
/// repository's commits belong to the user. The engine does the rest.
///
/// # Example
///
/// ```ignore
/// use tally::aggregate::Tally;
/// use tally::github::GitHubPlatform;
///
/// let tally = Tally::new(GitHubPlatform::default(), settings)?;
/// let totals = tally.get().await;
/// println!("{} projects, {} commits", totals.projects, totals.commits);
/// ```
#[async_trait]
pub trait ForgePlatform: Send + Sync {
    /// Display name used in logs and output.
    fn name(&self) -> &'static str;

    /// Listing of every repository visible to the user.
    fn listing_config(&self, settings: &Settings) -> ListingConfig;

    /// The user's commits in `repo` within the configured date range.
    ///
    /// Failures count as zero. Without a specialization every repository
    /// has no commits.
    async fn count_commits(&self, ctx: &TallyContext, repo: &Repo) -> u64 {
        let _ = (ctx, repo);
        0
    }
}
