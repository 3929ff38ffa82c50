//! Progress reporting for tallies.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): a listing spinner and a counting bar using indicatif
//! - Logging mode (non-TTY): structured logging using tracing

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use tally::{ProgressCallback, TallyProgress};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: TallyProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> Arc<ProgressCallback> {
        let reporter = Arc::clone(self);
        Arc::new(Box::new(move |event| {
            reporter.handle(event);
        }))
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tally::ListingEnd;

    use super::*;

    fn events() -> Vec<TallyProgress> {
        vec![
            TallyProgress::FetchingPage {
                endpoint: "https://forge.test/repos".to_string(),
                page: 1,
            },
            TallyProgress::FetchedPage {
                endpoint: "https://forge.test/repos".to_string(),
                page: 1,
                count: 2,
                total_so_far: 2,
            },
            TallyProgress::ListingComplete {
                endpoint: "https://forge.test/repos".to_string(),
                total: 2,
                pages: 1,
                end: ListingEnd::ShortPage,
            },
            TallyProgress::CountingRepos {
                platform: "GitHub".to_string(),
                count: 2,
                concurrency: 1,
            },
            TallyProgress::CountedRepo {
                name: "octocat/a".to_string(),
                commits: 4,
                is_project: true,
            },
            TallyProgress::RequestFailed {
                url: "https://forge.test/commits".to_string(),
                status: Some(502),
                error: "Bad Gateway".to_string(),
                payload: None,
            },
            TallyProgress::CountedRepo {
                name: "octocat/b".to_string(),
                commits: 0,
                is_project: false,
            },
            TallyProgress::TallyComplete {
                platform: "GitHub".to_string(),
                projects: 1,
                commits: 4,
            },
        ]
    }

    #[test]
    fn test_logging_reporter_handles_every_event() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();
        for event in events() {
            callback(event);
        }
        reporter.finish();
    }

    #[test]
    fn test_interactive_reporter_keeps_running_totals() {
        let reporter = InteractiveReporter::hidden();
        for event in events() {
            reporter.handle(event);
        }
        reporter.finish();

        assert_eq!(reporter.running_totals(), (1, 4));
    }

    #[test]
    fn test_interactive_reporter_resets_totals_per_count() {
        let reporter = InteractiveReporter::hidden();
        for event in events().into_iter().chain(events()) {
            reporter.handle(event);
        }

        assert_eq!(reporter.running_totals(), (1, 4));
    }
}
