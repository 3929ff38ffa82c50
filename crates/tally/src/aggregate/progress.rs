//! Progress reporting types for tally operations.
//!
//! The library never writes to a terminal or installs a logger. Everything a
//! user might want to see is emitted as a [`TallyProgress`] event through an
//! optional callback, and the caller decides how to render it.

use super::types::ListingEnd;

/// Progress events emitted while listing repositories and counting commits.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TallyProgress {
    /// About to fetch a page of a listing.
    FetchingPage {
        /// Listing endpoint.
        endpoint: String,
        /// Page number being fetched.
        page: u64,
    },

    /// Fetched a page of a listing.
    FetchedPage {
        endpoint: String,
        page: u64,
        /// Items on this page.
        count: usize,
        /// Running total of items fetched so far.
        total_so_far: usize,
    },

    /// A listing finished.
    ListingComplete {
        endpoint: String,
        /// Items in the listing.
        total: usize,
        /// Pages fetched.
        pages: u64,
        /// Why the listing stopped.
        end: ListingEnd,
    },

    /// The pagination ceiling was hit; the endpoint kept returning full pages.
    PageLimitReached { endpoint: String, max_pages: u64 },

    /// An API call failed. The tally carries on without its data.
    RequestFailed {
        url: String,
        /// HTTP status, if the server answered.
        status: Option<u16>,
        /// Short error message.
        error: String,
        /// Structured error body returned by the server, if any.
        payload: Option<serde_json::Value>,
    },

    /// An API call succeeded without a body.
    EmptyResponse { url: String },

    /// Starting to count commits.
    CountingRepos {
        /// Platform name.
        platform: String,
        /// Repositories to count.
        count: usize,
        /// Parallel counts in flight.
        concurrency: usize,
    },

    /// Counted the user's commits in one repository.
    CountedRepo {
        /// Repository display name.
        name: String,
        commits: u64,
        /// Whether the repository reached the project threshold.
        is_project: bool,
    },

    /// Counting finished.
    TallyComplete {
        platform: String,
        projects: u64,
        commits: u64,
    },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(TallyProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// # Example
///
/// ```ignore
/// use tally::aggregate::{ProgressCallback, TallyProgress, emit};
///
/// fn count(on_progress: Option<&ProgressCallback>) {
///     emit(on_progress, TallyProgress::Warning { message: "slow".into() });
/// }
/// ```
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: TallyProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
