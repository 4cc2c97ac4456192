//! Repository for the `daily_buckets` table (one row per date, hour and
//! ten-minute slot).

use chrono::NaiveDate;
use roadnoise_core::buckets::{BucketMap, BucketSummary, DailyKey};
use sqlx::{PgConnection, PgPool};

use super::values_placeholders;
use crate::models::bucket::DailyBucketRow;

const COLUMNS: &str = "bucket_date, hour, ten_minute_slot, vehicle_count, max_level";

/// Provides query operations for daily buckets.
pub struct DailyBucketRepo;

impl DailyBucketRepo {
    /// Plain insert, for bulk rebuilds into an empty table.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        rows: &[(DailyKey, BucketSummary)],
    ) -> Result<u64, sqlx::Error> {
        Self::write(conn, rows, "").await
    }

    /// Insert or overwrite rows with already-merged values.
    pub async fn upsert_batch(
        conn: &mut PgConnection,
        rows: &[(DailyKey, BucketSummary)],
    ) -> Result<u64, sqlx::Error> {
        Self::write(
            conn,
            rows,
            " ON CONFLICT (bucket_date, hour, ten_minute_slot) DO UPDATE SET \
                vehicle_count = EXCLUDED.vehicle_count, \
                max_level = EXCLUDED.max_level",
        )
        .await
    }

    async fn write(
        conn: &mut PgConnection,
        rows: &[(DailyKey, BucketSummary)],
        on_conflict: &str,
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "INSERT INTO daily_buckets ({COLUMNS}) VALUES {}{on_conflict}",
            values_placeholders(rows.len(), 5)
        );

        let mut q = sqlx::query(&query);
        for (key, summary) in rows {
            q = q
                .bind(key.date)
                .bind(key.hour)
                .bind(key.ten_minute_slot)
                .bind(summary.vehicle_count)
                .bind(summary.max_level);
        }

        let result = q.execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// Load and lock the stored rows for `keys`.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        keys: &[DailyKey],
    ) -> Result<BucketMap<DailyKey>, sqlx::Error> {
        if keys.is_empty() {
            return Ok(BucketMap::new());
        }

        let dates: Vec<NaiveDate> = keys.iter().map(|k| k.date).collect();
        let hours: Vec<i32> = keys.iter().map(|k| k.hour).collect();
        let slots: Vec<i32> = keys.iter().map(|k| k.ten_minute_slot).collect();

        let query = format!(
            "SELECT {COLUMNS} FROM daily_buckets \
             WHERE (bucket_date, hour, ten_minute_slot) IN \
                (SELECT UNNEST($1::DATE[]), UNNEST($2::INTEGER[]), UNNEST($3::INTEGER[])) \
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, DailyBucketRow>(&query)
            .bind(&dates)
            .bind(&hours)
            .bind(&slots)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(DailyBucketRow::into_entry).collect())
    }

    /// Distinct dates with at least one bucket, ascending.
    pub async fn list_dates(pool: &PgPool) -> Result<Vec<NaiveDate>, sqlx::Error> {
        sqlx::query_scalar::<_, NaiveDate>(
            "SELECT DISTINCT bucket_date FROM daily_buckets ORDER BY bucket_date",
        )
        .fetch_all(pool)
        .await
    }

    /// Bucket rows for one date, ordered by hour then slot.
    pub async fn list_for_date(
        pool: &PgPool,
        date: NaiveDate,
    ) -> Result<Vec<DailyBucketRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM daily_buckets WHERE bucket_date = $1 \
             ORDER BY hour, ten_minute_slot"
        );
        sqlx::query_as::<_, DailyBucketRow>(&query)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    /// Total vehicles on one date; zero when the date has no buckets.
    pub async fn total_for_date(pool: &PgPool, date: NaiveDate) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(vehicle_count), 0)::BIGINT FROM daily_buckets \
             WHERE bucket_date = $1",
        )
        .bind(date)
        .fetch_one(pool)
        .await
    }
}
