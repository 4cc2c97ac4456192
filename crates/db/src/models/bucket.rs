//! Monthly and daily bucket rows.

use chrono::NaiveDate;
use roadnoise_core::buckets::{BucketSummary, DailyKey, MonthlyKey};
use serde::Serialize;
use sqlx::FromRow;

/// One `monthly_buckets` row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MonthlyBucketRow {
    pub month: String,
    pub day: i32,
    pub vehicle_count: i64,
    pub max_level: Option<f64>,
}

impl MonthlyBucketRow {
    pub fn into_entry(self) -> (MonthlyKey, BucketSummary) {
        (
            MonthlyKey {
                month: self.month,
                day: self.day,
            },
            BucketSummary {
                vehicle_count: self.vehicle_count,
                max_level: self.max_level,
            },
        )
    }
}

/// One `daily_buckets` row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct DailyBucketRow {
    pub bucket_date: NaiveDate,
    pub hour: i32,
    pub ten_minute_slot: i32,
    pub vehicle_count: i64,
    pub max_level: Option<f64>,
}

impl DailyBucketRow {
    pub fn into_entry(self) -> (DailyKey, BucketSummary) {
        (
            DailyKey {
                date: self.bucket_date,
                hour: self.hour,
                ten_minute_slot: self.ten_minute_slot,
            },
            BucketSummary {
                vehicle_count: self.vehicle_count,
                max_level: self.max_level,
            },
        )
    }
}
