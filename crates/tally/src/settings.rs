//! Settings and the permissive options resolver.
//!
//! User options arrive as loosely-typed JSON (from a config file, environment
//! variables or CLI flags). [`resolve_options`] lays them over the default
//! table key by key and keeps a user value only when it has the same kind as
//! the default. Unknown keys are dropped and mismatched values fall back to
//! the default without an error: a counting tool is more useful running on
//! defaults than refusing to start.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retry::DEFAULT_MAX_RETRIES;

/// Default pagination ceiling per listing.
pub const DEFAULT_MAX_PAGES: u64 = 1_000;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default proactive request rate.
pub const DEFAULT_REQUESTS_PER_SECOND: u64 = 10;

/// Resolved settings for one tally.
///
/// Every field always holds a type-correct value; build it with
/// [`Settings::resolve`] and treat it as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Platform login, used for basic authentication and commit matching.
    pub username: String,
    /// Personal access token.
    pub access_token: String,
    /// Commit e-mail addresses attributed to the user.
    pub emails: Vec<String>,
    /// Commit author names attributed to the user.
    pub names: Vec<String>,
    /// Lower date bound (ISO-8601), empty for none.
    pub from_date: String,
    /// Upper date bound (ISO-8601), empty for none.
    pub until_date: String,
    /// Minimum commits for a repo to count as a project.
    pub min_commits: u64,
    /// Pagination ceiling per listing.
    pub max_pages: u64,
    /// Parallel per-repo commit counts.
    pub concurrency: u64,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Proactive request rate; zero disables pacing.
    pub requests_per_second: u64,
    /// Transport-level retries for transient failures.
    pub max_retries: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::new(),
            access_token: String::new(),
            emails: Vec::new(),
            names: Vec::new(),
            from_date: String::new(),
            until_date: String::new(),
            min_commits: 1,
            max_pages: DEFAULT_MAX_PAGES,
            concurrency: 1,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            max_retries: DEFAULT_MAX_RETRIES as u64,
        }
    }
}

impl Settings {
    /// The default options table, as the resolver sees it.
    pub fn default_options() -> Map<String, Value> {
        match serde_json::to_value(Settings::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Resolve user options over the defaults.
    ///
    /// Never fails: anything unusable in `user` is ignored.
    pub fn resolve(user: &Value) -> Self {
        let empty = Map::new();
        let user = user.as_object().unwrap_or(&empty);
        let resolved = resolve_options(user, &Self::default_options());

        match serde_json::from_value(Value::Object(resolved)) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!("Resolved options did not deserialize, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The lower date bound, if set and parseable.
    pub fn from_bound(&self) -> Option<DateTime<Utc>> {
        parse_bound(&self.from_date)
    }

    /// The upper date bound, if set and parseable.
    pub fn until_bound(&self) -> Option<DateTime<Utc>> {
        parse_bound(&self.until_date)
    }

    /// Concurrency as a usable worker count (at least one).
    pub fn worker_count(&self) -> usize {
        usize::try_from(self.concurrency).unwrap_or(usize::MAX).max(1)
    }
}

fn parse_bound(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        tracing::warn!("Ignoring unparseable date bound {:?}", raw);
    }
    parsed
}

/// Parse an ISO-8601 date or date-time.
///
/// Accepts RFC 3339 timestamps, naive date-times (taken as UTC) and plain
/// `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The kind of a JSON value, as far as option resolution cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    /// Non-negative integer.
    Unsigned,
    /// Any other number (negative or fractional).
    Number,
    String,
    /// A list whose elements are all strings, including the empty list.
    StringList,
    List,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_u64() => Self::Unsigned,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(items) if items.iter().all(Value::is_string) => Self::StringList,
            Value::Array(_) => Self::List,
            Value::Object(_) => Self::Object,
        }
    }
}

/// Merge `user` over `defaults`.
///
/// The result holds exactly the keys of `defaults`. A user value replaces the
/// default only when [`ValueKind::of`] agrees for both.
pub fn resolve_options(user: &Map<String, Value>, defaults: &Map<String, Value>) -> Map<String, Value> {
    defaults
        .iter()
        .map(|(key, default)| {
            let value = match user.get(key) {
                Some(candidate) if ValueKind::of(candidate) == ValueKind::of(default) => {
                    candidate.clone()
                }
                Some(candidate) => {
                    tracing::debug!(
                        "Option {} has kind {:?}, expected {:?}; using default",
                        key,
                        ValueKind::of(candidate),
                        ValueKind::of(default)
                    );
                    default.clone()
                }
                None => default.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}
