use tally::TallyProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: TallyProgress) {
        match event {
            TallyProgress::FetchingPage { endpoint, page } => {
                tracing::debug!(endpoint = %endpoint, page, "Fetching page");
            }

            TallyProgress::FetchedPage {
                endpoint,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(endpoint = %endpoint, page, count, total_so_far, "Fetched page");
            }

            TallyProgress::ListingComplete {
                endpoint,
                total,
                pages,
                end,
            } => {
                tracing::info!(endpoint = %endpoint, total, pages, end = %end, "Listed repositories");
            }

            TallyProgress::PageLimitReached {
                endpoint,
                max_pages,
            } => {
                tracing::error!(endpoint = %endpoint, max_pages, "Page limit reached, listing truncated");
            }

            TallyProgress::RequestFailed {
                url,
                status,
                error,
                payload,
            } => {
                tracing::warn!(
                    url = %url,
                    status = ?status,
                    payload = ?payload,
                    "Request failed: {}",
                    error
                );
            }

            TallyProgress::EmptyResponse { url } => {
                tracing::debug!(url = %url, "Empty response");
            }

            TallyProgress::CountingRepos {
                platform,
                count,
                concurrency,
            } => {
                tracing::info!(platform = %platform, count, concurrency, "Counting commits");
            }

            TallyProgress::CountedRepo {
                name,
                commits,
                is_project,
            } => {
                if is_project {
                    tracing::info!(repo = %name, commits, "Counted");
                } else {
                    tracing::debug!(repo = %name, commits, "Below project threshold");
                }
            }

            TallyProgress::TallyComplete {
                platform,
                projects,
                commits,
            } => {
                tracing::info!(platform = %platform, projects, commits, "Tally complete");
            }

            TallyProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
