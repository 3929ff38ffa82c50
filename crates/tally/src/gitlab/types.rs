//! GitLab API data types.

use serde::Deserialize;

use crate::platform::CommitAuthor;

/// One entry of `GET /projects/:id/repository/commits`.
///
/// GitLab reports git identities only; commits are not linked to accounts.
///
/// API docs: https://docs.gitlab.com/ee/api/commits.html#list-repository-commits
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    /// Commit SHA.
    pub id: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
    pub authored_date: Option<String>,
}

impl GitLabCommit {
    /// Identities that attribute this commit to someone: the author, and
    /// the committer by e-mail only.
    pub fn identities(&self) -> [CommitAuthor; 2] {
        [
            CommitAuthor {
                login: None,
                name: self.author_name.clone(),
                email: self.author_email.clone(),
            },
            CommitAuthor {
                login: None,
                name: None,
                email: self.committer_email.clone(),
            },
        ]
    }
}
