//! Attributing commits to the configured user.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::settings::Settings;

/// Count the commits in `items` for which `is_match` holds.
///
/// Items that do not deserialize as `T` are skipped.
pub fn count_matching<T: DeserializeOwned>(items: Vec<Value>, is_match: impl Fn(&T) -> bool) -> u64 {
    let mut count = 0;
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(commit) if is_match(&commit) => count += 1,
            Ok(_) => {}
            Err(e) => tracing::debug!("Skipping malformed commit: {}", e),
        }
    }
    count
}

/// Author identity of one commit, as far as a platform reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitAuthor {
    /// Platform account linked to the commit, if the platform resolved one.
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Decides whether a commit belongs to the user.
///
/// Logins and e-mail addresses compare case-insensitively; names compare
/// exactly (after trimming).
#[derive(Debug, Clone, Default)]
pub struct CommitMatcher {
    login: Option<String>,
    emails: HashSet<String>,
    names: HashSet<String>,
}

impl CommitMatcher {
    pub fn from_settings(settings: &Settings) -> Self {
        let login = Some(settings.username.trim().to_lowercase()).filter(|l| !l.is_empty());
        let emails = settings
            .emails
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        let names = settings
            .names
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        Self {
            login,
            emails,
            names,
        }
    }

    /// Add e-mail addresses, such as those registered on the user's account.
    #[must_use]
    pub fn with_emails<S: AsRef<str>>(mut self, emails: impl IntoIterator<Item = S>) -> Self {
        self.emails.extend(
            emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty()),
        );
        self
    }

    /// Whether e-mail or name filters were configured.
    ///
    /// Without them only a commit's platform login can identify the user.
    #[inline]
    pub fn has_identity_filters(&self) -> bool {
        !self.emails.is_empty() || !self.names.is_empty()
    }

    pub fn matches(&self, author: &CommitAuthor) -> bool {
        if let (Some(login), Some(author_login)) = (&self.login, &author.login)
            && author_login.eq_ignore_ascii_case(login)
        {
            return true;
        }
        if let Some(ref email) = author.email
            && self.emails.contains(&email.trim().to_lowercase())
        {
            return true;
        }
        author
            .name
            .as_ref()
            .is_some_and(|name| self.names.contains(name.trim()))
    }

    /// Whether any of `authors` (author, committer, ...) is the user.
    pub fn matches_any<'a>(&self, authors: impl IntoIterator<Item = &'a CommitAuthor>) -> bool {
        authors.into_iter().any(|a| self.matches(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> CommitMatcher {
        CommitMatcher::from_settings(&Settings {
            username: "OctoCat".to_string(),
            emails: vec!["Octo@Example.com".to_string(), "  ".to_string()],
            names: vec!["The Octocat".to_string()],
            ..Settings::default()
        })
    }

    fn author(login: Option<&str>, name: Option<&str>, email: Option<&str>) -> CommitAuthor {
        CommitAuthor {
            login: login.map(str::to_string),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_matches_login_case_insensitively() {
        assert!(matcher().matches(&author(Some("octocat"), None, None)));
        assert!(!matcher().matches(&author(Some("hubot"), None, None)));
    }

    #[test]
    fn test_matches_email_case_insensitively() {
        assert!(matcher().matches(&author(None, None, Some("octo@example.COM"))));
        assert!(!matcher().matches(&author(None, None, Some("other@example.com"))));
    }

    #[test]
    fn test_matches_exact_name() {
        assert!(matcher().matches(&author(None, Some("The Octocat"), None)));
        assert!(!matcher().matches(&author(None, Some("the octocat"), None)));
    }

    #[test]
    fn test_unknown_author_never_matches() {
        assert!(!matcher().matches(&CommitAuthor::default()));
    }

    #[test]
    fn test_blank_username_matches_no_login() {
        let matcher = CommitMatcher::from_settings(&Settings::default());
        assert!(!matcher.matches(&author(Some(""), None, None)));
        assert!(!matcher.has_identity_filters());
    }

    #[test]
    fn test_matches_any_checks_every_identity() {
        let committer = author(None, None, Some("octo@example.com"));
        let other = author(Some("hubot"), None, None);
        assert!(matcher().matches_any([&other, &committer]));
        assert!(!matcher().matches_any([&other]));
    }

    #[test]
    fn test_count_matching_skips_malformed_items() {
        #[derive(serde::Deserialize)]
        struct Commit {
            email: String,
        }

        let items = vec![
            serde_json::json!({"email": "octo@example.com"}),
            serde_json::json!({"email": "other@example.com"}),
            serde_json::json!({"no_email": true}),
            serde_json::json!({"email": "OCTO@example.com"}),
        ];
        let matcher = matcher();

        let count = count_matching(items, |c: &Commit| {
            matcher.matches(&author(None, None, Some(&c.email)))
        });

        assert_eq!(count, 2);
    }

    #[test]
    fn test_identity_filters_ignore_blank_entries() {
        let matcher = CommitMatcher::from_settings(&Settings {
            emails: vec![" ".to_string()],
            ..Settings::default()
        });
        assert!(!matcher.has_identity_filters());
    }

    #[test]
    fn test_with_emails_adds_account_addresses() {
        let matcher = CommitMatcher::from_settings(&Settings::default())
            .with_emails(["Jane@Corp.example", " "]);

        assert!(matcher.has_identity_filters());
        assert!(matcher.matches(&author(None, None, Some("jane@corp.example"))));
        assert!(!matcher.matches(&author(None, None, Some("jo@corp.example"))));
    }
}
