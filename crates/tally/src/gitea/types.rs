//! Gitea API data types.

use serde::Deserialize;

use crate::platform::CommitAuthor;

/// One entry of `GET /repos/{owner}/{repo}/commits`.
///
/// We define only the fields we need, which keeps this working across
/// Gitea, Forgejo and Codeberg versions.
///
/// API docs: https://docs.gitea.com/api/1.20/#tag/repository/operation/repoGetAllCommits
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommit {
    pub sha: String,
    /// Git-level commit data.
    pub commit: GiteaCommitDetail,
    /// Account linked to the author e-mail, if any.
    #[serde(default)]
    pub author: Option<GiteaUser>,
}

/// Git-level part of a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommitDetail {
    #[serde(default)]
    pub author: Option<GiteaSignature>,
}

/// Name and e-mail recorded in a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaSignature {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
}

/// Gitea user.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaUser {
    /// Username/login.
    pub login: String,
}

impl GiteaCommit {
    pub fn author_identity(&self) -> CommitAuthor {
        let signature = self.commit.author.as_ref();
        CommitAuthor {
            login: self
                .author
                .as_ref()
                .map(|u| u.login.clone())
                .filter(|l| !l.is_empty()),
            name: signature.and_then(|s| s.name.clone()),
            email: signature.and_then(|s| s.email.clone()),
        }
    }
}
