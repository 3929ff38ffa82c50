//! The paginated lister.
//!
//! Walks one listing endpoint page by page, in order, until a short page,
//! a failed page, the date cutoff, the page ceiling or cancellation.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::ApiOutcome;
use crate::platform::{ListingConfig, Repo};
use crate::settings::parse_date;

use super::context::TallyContext;
use super::progress::{TallyProgress, emit};
use super::types::{Listing, ListingEnd};

/// Fetch every page of `config`, starting at `config.params.page`.
///
/// Never fails. A page that yields no data ends the listing with whatever
/// earlier pages produced. When `from_date` is set and the listing has an
/// updated field, a page whose last item is older than `from_date` is kept
/// and ends the listing.
pub(crate) async fn paginate(
    ctx: &TallyContext,
    mut config: ListingConfig,
    from_date: Option<DateTime<Utc>>,
    report_pages: bool,
) -> Listing {
    let max_pages = ctx.settings().max_pages.max(1);
    let items_per_page = config.items_per_page.max(1);
    let page_progress = if report_pages { ctx.progress() } else { None };

    let mut items: Vec<Value> = Vec::new();
    let mut pages: u64 = 0;

    let end = 'pages: loop {
        if ctx.is_cancelled() {
            break ListingEnd::Cancelled;
        }
        if pages >= max_pages {
            tracing::warn!(
                "Stopping {} after {} pages; it keeps returning full pages",
                config.endpoint,
                pages
            );
            ctx.emit(TallyProgress::PageLimitReached {
                endpoint: config.endpoint.clone(),
                max_pages,
            });
            break ListingEnd::PageLimit;
        }

        emit(
            page_progress,
            TallyProgress::FetchingPage {
                endpoint: config.endpoint.clone(),
                page: config.params.page,
            },
        );

        let query = config.params.to_query();
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel_token().cancelled() => break 'pages ListingEnd::Cancelled,
            outcome = ctx.api().get_from_api(&config.endpoint, &query, &config.request_options) => outcome,
        };
        pages += 1;

        let page = match outcome {
            ApiOutcome::Data(body) => match page_items(body, config.items_pointer.as_deref()) {
                Some(page) => page,
                None => {
                    tracing::debug!(
                        "Page {} of {} is not a list of items",
                        config.params.page,
                        config.endpoint
                    );
                    break ListingEnd::NoData;
                }
            },
            ApiOutcome::Empty | ApiOutcome::Failed(_) => break ListingEnd::NoData,
        };

        let count = page.len();
        let cutoff = match (from_date, config.updated_field.as_deref(), page.last()) {
            (Some(from), Some(field), Some(last)) => updated_before(last, field, from),
            _ => false,
        };

        items.extend(page);
        emit(
            page_progress,
            TallyProgress::FetchedPage {
                endpoint: config.endpoint.clone(),
                page: config.params.page,
                count,
                total_so_far: items.len(),
            },
        );

        if cutoff {
            break ListingEnd::DateCutoff;
        }
        if count < items_per_page {
            break ListingEnd::ShortPage;
        }
        config.params.page += 1;
    };

    tracing::debug!(
        "Listed {} items from {} in {} pages ({})",
        items.len(),
        config.endpoint,
        pages,
        end
    );
    emit(
        page_progress,
        TallyProgress::ListingComplete {
            endpoint: config.endpoint,
            total: items.len(),
            pages,
            end,
        },
    );

    Listing { items, end, pages }
}

/// The item array of a page body, unwrapped through `pointer` if given.
fn page_items(mut body: Value, pointer: Option<&str>) -> Option<Vec<Value>> {
    let items = match pointer {
        Some(pointer) => body.pointer_mut(pointer).map(Value::take)?,
        None => body,
    };
    match items {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Whether `item`'s `field` holds a date strictly before `from`.
///
/// A missing or unparseable date never triggers the cutoff.
fn updated_before(item: &Value, field: &str, from: DateTime<Utc>) -> bool {
    Repo::lookup(item, field)
        .and_then(Value::as_str)
        .and_then(parse_date)
        .is_some_and(|updated| updated < from)
}
