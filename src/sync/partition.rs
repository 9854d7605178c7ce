use std::collections::BTreeMap;

use crate::sync::client::LikedItem;
use crate::sync::month::MonthKey;

/// Liked items per month, each bucket oldest first. Iterates chronologically.
pub type MonthBuckets = BTreeMap<MonthKey, Vec<LikedItem>>;

/// Group a newest-first feed into one bucket per calendar month, from
/// `start` through the month of the most recent like.
///
/// Months without likes are present with an empty bucket. Items liked before
/// `start` are outside the range and dropped.
pub fn partition_by_month(items: &[LikedItem], start: MonthKey) -> MonthBuckets {
    let mut buckets = MonthBuckets::new();
    let Some(newest) = items.iter().map(|item| item.liked_at).max() else {
        return buckets;
    };

    for key in MonthKey::range_inclusive(start, MonthKey::of(&newest)) {
        buckets.insert(key, Vec::new());
    }

    // feed order is newest first; walking it backwards yields liking order
    for item in items.iter().rev() {
        if let Some(bucket) = buckets.get_mut(&MonthKey::of(&item.liked_at)) {
            bucket.push(item.clone());
        }
    }

    buckets
}
