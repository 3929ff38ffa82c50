//! GitHub API data types.

use serde::Deserialize;

use crate::platform::CommitAuthor;

/// One entry of `GET /repos/{owner}/{repo}/commits`.
///
/// Only the fields needed to attribute the commit are deserialized.
///
/// API docs: https://docs.github.com/en/rest/commits/commits#list-commits
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    /// Git-level commit data.
    pub commit: GitHubCommitDetail,
    /// GitHub account linked to the author e-mail, if any.
    #[serde(default)]
    pub author: Option<GitHubAccount>,
}

/// Git-level part of a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    #[serde(default)]
    pub author: Option<GitHubSignature>,
    #[serde(default)]
    pub committer: Option<GitHubSignature>,
}

/// Name, e-mail and date recorded in a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSignature {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
}

/// A GitHub account as embedded in other responses.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAccount {
    pub login: String,
}

impl GitHubCommit {
    /// The commit's author identity.
    pub fn author_identity(&self) -> CommitAuthor {
        let signature = self.commit.author.as_ref();
        CommitAuthor {
            login: self.author.as_ref().map(|a| a.login.clone()),
            name: signature.and_then(|s| s.name.clone()),
            email: signature.and_then(|s| s.email.clone()),
        }
    }
}
