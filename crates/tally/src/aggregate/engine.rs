//! The repo aggregator.
//!
//! Lists every repository through the platform's listing, asks the platform
//! for the user's commits in each one and folds the counts into
//! [`ActivityTotals`].

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::platform::{self, ForgePlatform, Repo};
use crate::settings::Settings;

use super::context::TallyContext;
use super::progress::{ProgressCallback, TallyProgress};
use super::types::{ActivityTotals, Listing};

/// A tally of one user's activity on one platform.
///
/// # Example
///
/// ```ignore
/// use tally::aggregate::Tally;
/// use tally::gitlab::GitLabPlatform;
///
/// let tally = Tally::new(GitLabPlatform::default(), settings)?;
/// let totals = tally.get().await;
/// ```
pub struct Tally<P> {
    platform: Arc<P>,
    ctx: TallyContext,
}

impl<P: ForgePlatform + 'static> Tally<P> {
    /// Create a tally over the network transport described by `settings`.
    ///
    /// # Errors
    ///
    /// Fails only when the HTTP client cannot be built.
    pub fn new(platform: P, settings: Settings) -> platform::Result<Self> {
        let api = ApiClient::new(&settings)?;
        Ok(Self::with_client(platform, settings, api))
    }

    /// Create a tally over an existing client.
    pub fn with_client(platform: P, settings: Settings, api: ApiClient) -> Self {
        Self {
            platform: Arc::new(platform),
            ctx: TallyContext::new(api, settings),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.ctx = self.ctx.with_progress(callback);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.ctx = self.ctx.with_cancellation(cancel);
        self
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[inline]
    pub fn context(&self) -> &TallyContext {
        &self.ctx
    }

    /// Every repository visible to the user, in listing order.
    ///
    /// Uses the lower date bound for early termination when one is set.
    pub async fn get_repos(&self) -> Listing {
        let settings = self.ctx.settings();
        let config = self.platform.listing_config(settings);
        self.ctx.list_pages(config, settings.from_bound()).await
    }

    /// Count projects and commits.
    ///
    /// Never fails; a repository whose count fails contributes nothing, and
    /// a failed listing yields zero totals.
    pub async fn get(&self) -> ActivityTotals {
        let repos = self.get_repos().await.into_repos();
        let totals = self.count_repos(repos).await;

        self.ctx.emit(TallyProgress::TallyComplete {
            platform: self.platform.name().to_string(),
            projects: totals.projects,
            commits: totals.commits,
        });

        totals
    }

    /// Count every repository with bounded concurrency.
    ///
    /// Counts start in listing order and are folded in listing order, so
    /// events and totals do not depend on which request finishes first.
    async fn count_repos(&self, repos: Vec<Repo>) -> ActivityTotals {
        let mut totals = ActivityTotals::default();
        if repos.is_empty() {
            return totals;
        }

        let min_commits = self.ctx.settings().min_commits;
        let concurrency = self.ctx.settings().worker_count().min(repos.len());
        let semaphore = Arc::new(Semaphore::new(concurrency));

        self.ctx.emit(TallyProgress::CountingRepos {
            platform: self.platform.name().to_string(),
            count: repos.len(),
            concurrency,
        });

        let mut pending = PendingCounts::with_capacity(repos.len());

        for repo in repos {
            let permit = tokio::select! {
                biased;
                _ = self.ctx.cancel_token().cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let platform = Arc::clone(&self.platform);
            let ctx = self.ctx.clone();
            pending.push(tokio::spawn(async move {
                let _permit = permit;
                let commits = platform.count_commits(&ctx, &repo).await;
                (repo.display_name(), commits)
            }));

            while pending.front_finished() {
                if let Some(joined) = pending.next().await {
                    self.fold(joined, &mut totals, min_commits);
                }
            }
        }

        if self.ctx.is_cancelled() {
            tracing::debug!("Tally cancelled; uncounted repositories contribute nothing");
        }

        while let Some(joined) = pending.next().await {
            self.fold(joined, &mut totals, min_commits);
        }

        totals
    }

    fn fold(
        &self,
        joined: Result<(String, u64), JoinError>,
        totals: &mut ActivityTotals,
        min_commits: u64,
    ) {
        match joined {
            Ok((name, commits)) => {
                let is_project = totals.record(commits, min_commits);
                tracing::debug!("{}: {} commits", name, commits);
                self.ctx.emit(TallyProgress::CountedRepo {
                    name,
                    commits,
                    is_project,
                });
            }
            Err(e) => {
                self.ctx.emit(TallyProgress::Warning {
                    message: format!("Counting task failed: {}", e),
                });
            }
        }
    }
}

/// Counting tasks in spawn order.
///
/// Tasks still queued when this is dropped are aborted, so dropping a
/// `get()` future stops its counts.
struct PendingCounts(VecDeque<JoinHandle<(String, u64)>>);

impl PendingCounts {
    fn with_capacity(capacity: usize) -> Self {
        Self(VecDeque::with_capacity(capacity))
    }

    fn push(&mut self, handle: JoinHandle<(String, u64)>) {
        self.0.push_back(handle);
    }

    fn front_finished(&self) -> bool {
        self.0.front().is_some_and(|h| h.is_finished())
    }

    /// Wait for the oldest task. The handle stays queued while awaited.
    async fn next(&mut self) -> Option<Result<(String, u64), JoinError>> {
        let joined = match self.0.front_mut() {
            Some(handle) => handle.await,
            None => return None,
        };
        self.0.pop_front();
        Some(joined)
    }
}

impl Drop for PendingCounts {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

impl<P> std::fmt::Debug for Tally<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tally").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}
