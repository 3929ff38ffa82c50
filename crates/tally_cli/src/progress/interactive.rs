use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tally::TallyProgress;

const TICK: Duration = Duration::from_millis(100);

/// Progress state behind a single lock.
#[derive(Default)]
struct ProgressState {
    /// Spinner for the repository listing.
    list_bar: Option<ProgressBar>,
    /// Bar for per-repository commit counts.
    count_bar: Option<ProgressBar>,
    /// Running totals shown on the count bar.
    projects: u64,
    commits: u64,
}

/// Interactive progress reporter using indicatif.
///
/// Draws a spinner while repositories are listed, then a bar that advances
/// as each repository's commits are counted.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ))
    }

    fn list_bar(&self, state: &mut ProgressState) -> ProgressBar {
        state
            .list_bar
            .get_or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(format!("{:10}", "Listing"));
                pb.enable_steady_tick(TICK);
                pb
            })
            .clone()
    }

    fn note(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{}", line);
        }
    }

    pub fn handle(&self, event: TallyProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            TallyProgress::FetchingPage { page, .. } => {
                let pb = self.list_bar(&mut state);
                if page <= 1 {
                    pb.set_message("Fetching repositories...");
                }
            }

            TallyProgress::FetchedPage {
                page, total_so_far, ..
            } => {
                let pb = self.list_bar(&mut state);
                pb.set_message(format!("Page {} ({} repos)", page, total_so_far));
            }

            TallyProgress::ListingComplete { total, end, .. } => {
                let pb = self.list_bar(&mut state);
                if !pb.is_finished() {
                    pb.finish_with_message(format!("✓ {} repos ({})", total, end));
                }
            }

            TallyProgress::PageLimitReached {
                endpoint,
                max_pages,
            } => {
                self.note(format!(
                    "✗ Stopped {} after {} pages; totals may be incomplete",
                    endpoint, max_pages
                ));
            }

            TallyProgress::RequestFailed { url, error, .. } => {
                self.note(format!("⚠ {}: {}", url, error));
            }

            TallyProgress::CountingRepos {
                platform,
                count,
                concurrency,
            } => {
                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:10}", "Counting"));
                pb.set_message(format!("{} ({} parallel)", platform, concurrency));
                state.projects = 0;
                state.commits = 0;
                state.count_bar = Some(pb);
            }

            TallyProgress::CountedRepo {
                commits,
                is_project,
                ..
            } => {
                state.commits += commits;
                if is_project {
                    state.projects += 1;
                }
                if let Some(ref pb) = state.count_bar {
                    pb.inc(1);
                    pb.set_message(format!(
                        "{} commits in {} projects",
                        state.commits, state.projects
                    ));
                }
            }

            TallyProgress::TallyComplete {
                projects, commits, ..
            } => {
                if let Some(ref pb) = state.count_bar
                    && !pb.is_finished()
                {
                    pb.finish_with_message(format!(
                        "✓ {} commits in {} projects",
                        commits, projects
                    ));
                }
            }

            TallyProgress::Warning { message } => {
                self.note(format!("⚠ {}", message));
            }

            _ => {}
        }
    }

    /// Running totals as drawn on the count bar.
    #[cfg(test)]
    pub fn running_totals(&self) -> (u64, u64) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        (state.projects, state.commits)
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pb in [&state.list_bar, &state.count_bar].into_iter().flatten() {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
