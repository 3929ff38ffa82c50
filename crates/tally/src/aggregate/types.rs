//! Result types of listings and tallies.

use serde::Serialize;
use serde_json::Value;

use crate::platform::Repo;

/// Final counts of one tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTotals {
    /// Repositories with at least `min_commits` (and at least one) commits.
    pub projects: u64,
    /// Sum of the user's commits over every repository, including those
    /// below the project threshold.
    pub commits: u64,
}

impl ActivityTotals {
    /// Fold one repository's commit count into the totals.
    ///
    /// Returns whether the repository counts as a project.
    pub fn record(&mut self, commits: u64, min_commits: u64) -> bool {
        if commits == 0 {
            return false;
        }
        self.commits = self.commits.saturating_add(commits);
        let is_project = commits >= min_commits;
        if is_project {
            self.projects += 1;
        }
        is_project
    }
}

/// Why a listing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingEnd {
    /// A page shorter than the page size marked the end of the data.
    ShortPage,
    /// The last item of a page was older than the lower date bound.
    DateCutoff,
    /// The accessor returned no data, or a body that was not a list.
    NoData,
    /// The pagination ceiling was reached.
    PageLimit,
    /// The tally was cancelled.
    Cancelled,
}

impl std::fmt::Display for ListingEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ListingEnd::ShortPage => "end of data",
            ListingEnd::DateCutoff => "date cutoff",
            ListingEnd::NoData => "no data",
            ListingEnd::PageLimit => "page limit",
            ListingEnd::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A fully materialized listing, items in page order.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub items: Vec<Value>,
    pub end: ListingEnd,
    /// Pages fetched, including a failed final fetch.
    pub pages: u64,
}

impl Listing {
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The items as repositories.
    pub fn into_repos(self) -> Vec<Repo> {
        self.items.into_iter().map(Repo::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_skips_zero() {
        let mut totals = ActivityTotals::default();
        assert!(!totals.record(0, 0));
        assert_eq!(totals, ActivityTotals::default());
    }

    #[test]
    fn test_record_below_threshold_adds_commits_only() {
        let mut totals = ActivityTotals::default();
        assert!(!totals.record(2, 3));
        assert_eq!(totals, ActivityTotals { projects: 0, commits: 2 });
    }

    #[test]
    fn test_record_threshold_is_inclusive() {
        let mut totals = ActivityTotals::default();
        assert!(totals.record(3, 3));
        assert_eq!(totals, ActivityTotals { projects: 1, commits: 3 });
    }

    #[test]
    fn test_record_mixed_counts() {
        let mut totals = ActivityTotals::default();
        for count in [0, 5, 2] {
            totals.record(count, 3);
        }
        assert_eq!(totals, ActivityTotals { projects: 1, commits: 7 });
    }

    #[test]
    fn test_listing_end_display() {
        assert_eq!(ListingEnd::DateCutoff.to_string(), "date cutoff");
        assert_eq!(ListingEnd::PageLimit.to_string(), "page limit");
    }
}
