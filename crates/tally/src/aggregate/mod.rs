//! Platform-agnostic tally engine.
//!
//! # Module Structure
//!
//! - [`types`] - Result types: `ActivityTotals`, `Listing`, `ListingEnd`
//! - [`progress`] - Progress reporting: `TallyProgress`, `ProgressCallback`, `emit()`
//! - [`context`] - `TallyContext`, the state shared with platform strategies
//! - `listing` - The paginated lister
//! - [`engine`] - The repo aggregator: `Tally`
//!
//! The engine never fails once built. Failed requests degrade to fewer
//! repositories or fewer commits, and are reported as progress events.

pub mod context;
pub mod engine;
mod listing;
pub mod progress;
pub mod types;

pub use context::TallyContext;
pub use engine::Tally;
pub use progress::{ProgressCallback, TallyProgress, emit};
pub use types::{ActivityTotals, Listing, ListingEnd};
