//! Repository for the `monthly_buckets` table (one row per month + day).

use roadnoise_core::buckets::{BucketMap, BucketSummary, MonthlyKey};
use sqlx::{PgConnection, PgPool};

use super::values_placeholders;
use crate::models::bucket::MonthlyBucketRow;

const COLUMNS: &str = "month, day, vehicle_count, max_level";

/// Provides query operations for monthly buckets.
pub struct MonthlyBucketRepo;

impl MonthlyBucketRepo {
    /// Plain insert, for bulk rebuilds into an empty table.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        rows: &[(MonthlyKey, BucketSummary)],
    ) -> Result<u64, sqlx::Error> {
        Self::write(conn, rows, "").await
    }

    /// Insert or overwrite rows with already-merged values.
    pub async fn upsert_batch(
        conn: &mut PgConnection,
        rows: &[(MonthlyKey, BucketSummary)],
    ) -> Result<u64, sqlx::Error> {
        Self::write(
            conn,
            rows,
            " ON CONFLICT (month, day) DO UPDATE SET \
                vehicle_count = EXCLUDED.vehicle_count, \
                max_level = EXCLUDED.max_level",
        )
        .await
    }

    async fn write(
        conn: &mut PgConnection,
        rows: &[(MonthlyKey, BucketSummary)],
        on_conflict: &str,
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "INSERT INTO monthly_buckets ({COLUMNS}) VALUES {}{on_conflict}",
            values_placeholders(rows.len(), 4)
        );

        let mut q = sqlx::query(&query);
        for (key, summary) in rows {
            q = q
                .bind(&key.month)
                .bind(key.day)
                .bind(summary.vehicle_count)
                .bind(summary.max_level);
        }

        let result = q.execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// Load and lock the stored rows for `keys`.
    ///
    /// Keys with no stored row are simply absent from the result.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        keys: &[MonthlyKey],
    ) -> Result<BucketMap<MonthlyKey>, sqlx::Error> {
        if keys.is_empty() {
            return Ok(BucketMap::new());
        }

        let months: Vec<String> = keys.iter().map(|k| k.month.clone()).collect();
        let days: Vec<i32> = keys.iter().map(|k| k.day).collect();

        let query = format!(
            "SELECT {COLUMNS} FROM monthly_buckets \
             WHERE (month, day) IN \
                (SELECT UNNEST($1::TEXT[]), UNNEST($2::INTEGER[])) \
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, MonthlyBucketRow>(&query)
            .bind(&months)
            .bind(&days)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(MonthlyBucketRow::into_entry).collect())
    }

    /// Distinct months with at least one bucket, ascending.
    pub async fn list_months(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT month FROM monthly_buckets ORDER BY month")
            .fetch_all(pool)
            .await
    }

    /// Bucket rows for one month, ordered by day.
    pub async fn list_for_month(
        pool: &PgPool,
        month: &str,
    ) -> Result<Vec<MonthlyBucketRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM monthly_buckets WHERE month = $1 ORDER BY day");
        sqlx::query_as::<_, MonthlyBucketRow>(&query)
            .bind(month)
            .fetch_all(pool)
            .await
    }

    /// Total vehicles in one month; zero when the month has no buckets.
    pub async fn total_for_month(pool: &PgPool, month: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(vehicle_count), 0)::BIGINT FROM monthly_buckets WHERE month = $1",
        )
        .bind(month)
        .fetch_one(pool)
        .await
    }
}
