//! Time-bucket aggregation over one batch of detections.
//!
//! Two granularities share one summary shape:
//!
//! - monthly: `(YYYY-MM, day of month)`
//! - daily: `(date, hour, ten-minute slot)`
//!
//! [`aggregate`] only sees the batch it is given. Combining its output
//! with persisted buckets is [`crate::merge`]'s job.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike};

use crate::batch::IngestedRecord;
use crate::types::Timestamp;

/// Minutes per daily slot.
pub const SLOT_MINUTES: u32 = 10;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthlyKey {
    /// Calendar month as `YYYY-MM`.
    pub month: String,
    pub day: i32,
}

impl MonthlyKey {
    pub fn from_timestamp(ts: &Timestamp) -> Self {
        Self {
            month: ts.format("%Y-%m").to_string(),
            day: ts.day() as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DailyKey {
    pub date: NaiveDate,
    pub hour: i32,
    /// `minute / 10`, so `0..=5`.
    pub ten_minute_slot: i32,
}

impl DailyKey {
    pub fn from_timestamp(ts: &Timestamp) -> Self {
        Self {
            date: ts.date(),
            hour: ts.hour() as i32,
            ten_minute_slot: (ts.minute() / SLOT_MINUTES) as i32,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Vehicle count and loudest peak for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketSummary {
    pub vehicle_count: i64,
    pub max_level: Option<f64>,
}

impl BucketSummary {
    /// Summary of a single detection.
    pub fn single(peak_level: Option<f64>) -> Self {
        Self {
            vehicle_count: 1,
            max_level: peak_level,
        }
    }

    /// Counts add; levels take the maximum, with `None` as identity.
    pub fn combine(self, other: Self) -> Self {
        Self {
            vehicle_count: self.vehicle_count + other.vehicle_count,
            max_level: max_level(self.max_level, other.max_level),
        }
    }
}

/// Larger of two optional levels; an absent side adopts the other.
pub fn max_level(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

pub type BucketMap<K> = BTreeMap<K, BucketSummary>;

/// Both bucket views for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketAggregates {
    pub monthly: BucketMap<MonthlyKey>,
    pub daily: BucketMap<DailyKey>,
}

/// Group a batch by derived time key, counting detections and taking the
/// maximum peak level per group.
pub fn aggregate(records: &[IngestedRecord]) -> BucketAggregates {
    let mut out = BucketAggregates::default();

    for record in records {
        let at = &record.detection.detected_at;
        let one = BucketSummary::single(record.acoustic.peak_level);

        let monthly = out.monthly.entry(MonthlyKey::from_timestamp(at)).or_default();
        *monthly = monthly.combine(one);

        let daily = out.daily.entry(DailyKey::from_timestamp(at)).or_default();
        *daily = daily.combine(one);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::fixtures::{ingested, timestamp};

    #[test]
    fn keys_derive_from_detection_time() {
        let ts = timestamp(2025, 4, 1, 8, 17);

        let m = MonthlyKey::from_timestamp(&ts);
        assert_eq!(m.month, "2025-04");
        assert_eq!(m.day, 1);

        let d = DailyKey::from_timestamp(&ts);
        assert_eq!(d.date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(d.hour, 8);
        assert_eq!(d.ten_minute_slot, 1);
    }

    #[test]
    fn slot_boundaries() {
        assert_eq!(DailyKey::from_timestamp(&timestamp(2025, 4, 1, 0, 9)).ten_minute_slot, 0);
        assert_eq!(DailyKey::from_timestamp(&timestamp(2025, 4, 1, 0, 10)).ten_minute_slot, 1);
        assert_eq!(DailyKey::from_timestamp(&timestamp(2025, 4, 1, 23, 59)).ten_minute_slot, 5);
    }

    #[test]
    fn max_level_treats_none_as_identity() {
        assert_eq!(max_level(None, None), None);
        assert_eq!(max_level(Some(60.0), None), Some(60.0));
        assert_eq!(max_level(None, Some(75.0)), Some(75.0));
        assert_eq!(max_level(Some(60.0), Some(75.0)), Some(75.0));
    }

    #[test]
    fn aggregate_counts_and_takes_max_per_bucket() {
        let records = vec![
            ingested(1, timestamp(2025, 4, 1, 8, 11), Some(60.0)),
            ingested(2, timestamp(2025, 4, 1, 8, 19), Some(75.0)),
            ingested(3, timestamp(2025, 4, 1, 8, 20), None),
            ingested(4, timestamp(2025, 4, 2, 9, 0), None),
        ];

        let agg = aggregate(&records);

        let apr1 = MonthlyKey {
            month: "2025-04".into(),
            day: 1,
        };
        assert_eq!(agg.monthly[&apr1].vehicle_count, 3);
        assert_eq!(agg.monthly[&apr1].max_level, Some(75.0));
        assert_eq!(agg.monthly.len(), 2);

        let slot1 = DailyKey::from_timestamp(&timestamp(2025, 4, 1, 8, 10));
        assert_eq!(agg.daily[&slot1].vehicle_count, 2);
        assert_eq!(agg.daily[&slot1].max_level, Some(75.0));

        let slot2 = DailyKey::from_timestamp(&timestamp(2025, 4, 1, 8, 20));
        assert_eq!(agg.daily[&slot2], BucketSummary::single(None));

        let apr2 = DailyKey::from_timestamp(&timestamp(2025, 4, 2, 9, 0));
        assert_eq!(agg.daily[&apr2].max_level, None);
    }

    #[test]
    fn counts_sum_to_batch_size() {
        let records: Vec<_> = (0..37)
            .map(|i: i64| {
                let n = i as u32;
                let at = timestamp(2025, 4, 1 + n % 3, (n * 5) % 24, (n * 7) % 60);
                ingested(i + 1, at, Some(50.0 + i as f64))
            })
            .collect();

        let agg = aggregate(&records);
        let monthly_total: i64 = agg.monthly.values().map(|b| b.vehicle_count).sum();
        let daily_total: i64 = agg.daily.values().map(|b| b.vehicle_count).sum();
        assert_eq!(monthly_total, 37);
        assert_eq!(daily_total, 37);
    }

    #[test]
    fn empty_batch_has_no_buckets() {
        let agg = aggregate(&[]);
        assert!(agg.monthly.is_empty());
        assert!(agg.daily.is_empty());
    }
}
