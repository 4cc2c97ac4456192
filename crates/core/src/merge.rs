//! Merging a batch's buckets into persisted bucket state.
//!
//! Used by incremental runs only. A bulk run recomputes every bucket from
//! the full history and replaces the stored rows outright.

use crate::buckets::{BucketAggregates, BucketMap};

/// Fold `delta` into `persisted`.
///
/// New keys are inserted as-is; existing keys have their counts added
/// and their levels maxed. The operation is associative and commutative,
/// so merging two batches one after the other equals merging their union.
///
/// Callers that only load the persisted rows for `delta`'s keys get back
/// exactly the rows that need to be written.
pub fn merge_buckets<K: Ord + Clone>(
    mut persisted: BucketMap<K>,
    delta: &BucketMap<K>,
) -> BucketMap<K> {
    for (key, summary) in delta {
        let entry = persisted.entry(key.clone()).or_default();
        *entry = entry.combine(*summary);
    }
    persisted
}

/// [`merge_buckets`] applied to both granularities.
pub fn merge_aggregates(persisted: BucketAggregates, delta: &BucketAggregates) -> BucketAggregates {
    BucketAggregates {
        monthly: merge_buckets(persisted.monthly, &delta.monthly),
        daily: merge_buckets(persisted.daily, &delta.daily),
    }
}
