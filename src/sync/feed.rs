use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::SyncError;
use crate::sync::client::{LibraryClient, LikedItem, Page};

/// Drain a paginated feed.
///
/// The first page is always fetched. Further pages are fetched while a
/// continuation cursor exists and `keep_going` accepts everything gathered
/// so far.
pub fn drain_pages<T, F, K>(mut fetch: F, mut keep_going: K) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
    K: FnMut(&[T]) -> bool,
{
    let first = fetch(None)?;
    let mut items = first.items;
    let mut next = first.next;
    let mut pages = 1usize;

    while let Some(cursor) = next.take() {
        if !keep_going(&items) {
            break;
        }
        let page = fetch(Some(cursor.as_str()))?;
        if page.next.as_deref() == Some(cursor.as_str()) {
            return Err(SyncError::StalledCursor(cursor).into());
        }
        items.extend(page.items);
        next = page.next;
        pages += 1;
    }

    debug!(pages, items = items.len(), "drained paginated feed");
    Ok(items)
}

/// Liked items newest first, fetched until the oldest one seen is not
/// strictly newer than `start`.
///
/// Assumes the remote feed is in strictly descending `liked_at` order.
pub fn collect_liked_since<C: LibraryClient + ?Sized>(
    client: &C,
    start: DateTime<Utc>,
) -> Result<Vec<LikedItem>> {
    drain_pages(
        |cursor| client.list_liked_items(cursor),
        |items: &[LikedItem]| items.last().is_some_and(|item| item.liked_at > start),
    )
}

/// Complete membership of a playlist, across every page.
pub fn collect_collection_items<C: LibraryClient + ?Sized>(
    client: &C,
    collection_id: &str,
) -> Result<Vec<String>> {
    drain_pages(
        |cursor| client.list_collection_items(collection_id, cursor),
        |_: &[String]| true,
    )
}
