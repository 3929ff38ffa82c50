//! Shared state handed to platform strategies while a tally runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::platform::ListingConfig;
use crate::settings::Settings;

use super::listing::paginate;
use super::progress::{ProgressCallback, TallyProgress, emit};
use super::types::Listing;

/// Everything a [`ForgePlatform`](crate::platform::ForgePlatform) needs to
/// count commits: the authenticated client, the resolved settings, the
/// progress sink and the cancellation token.
///
/// Cheap to clone; clones share all of it.
#[derive(Clone)]
pub struct TallyContext {
    api: ApiClient,
    settings: Arc<Settings>,
    progress: Option<Arc<ProgressCallback>>,
    cancel: CancellationToken,
}

impl TallyContext {
    pub fn new(api: ApiClient, settings: Settings) -> Self {
        Self {
            api,
            settings: Arc::new(settings),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the progress callback. Request failures are reported through it too.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.api = self.api.with_progress(Arc::clone(&callback));
        self.progress = Some(callback);
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[inline]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[inline]
    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_deref()
    }

    #[inline]
    pub fn emit(&self, event: TallyProgress) {
        emit(self.progress(), event);
    }

    /// Walk a listing, reporting every page.
    pub async fn list_pages(
        &self,
        config: ListingConfig,
        from_date: Option<DateTime<Utc>>,
    ) -> Listing {
        paginate(self, config, from_date, true).await
    }

    /// Walk a secondary listing (commits of one repository) quietly.
    ///
    /// Only failures and the page ceiling are reported.
    pub async fn list_all(&self, config: ListingConfig) -> Listing {
        paginate(self, config, None, false).await
    }
}

impl std::fmt::Debug for TallyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TallyContext")
            .field("api", &self.api)
            .field("min_commits", &self.settings.min_commits)
            .field("max_pages", &self.settings.max_pages)
            .field("has_progress", &self.progress.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
