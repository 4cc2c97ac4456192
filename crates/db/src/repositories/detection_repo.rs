//! Repository for the `detections` table.

use std::collections::HashSet;

use chrono::NaiveDate;
use roadnoise_core::batch::IngestedRecord;
use roadnoise_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use super::values_placeholders;
use crate::models::detection::{DetectionRow, LoudDetection};

/// Column list for `detections`; SELECT and INSERT use the same set.
const COLUMNS: &str = "\
    detection_id, source_key, camera_id, class_probability, class_id, \
    detected_at, saved_at, track_point_count, intersection_x, intersection_y, \
    box_x1, box_y1, box_x2, box_y2, frame_timestamp, track_id, sequence_length, \
    full_image_path, debug_image_path";

const COLUMN_COUNT: usize = 19;

/// Provides query operations for detections.
pub struct DetectionRepo;

impl DetectionRepo {
    /// Insert a chunk of detections with one multi-row INSERT.
    ///
    /// Callers keep chunks small enough to stay under the 65535 bind
    /// parameter limit.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        records: &[IngestedRecord],
    ) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "INSERT INTO detections ({COLUMNS}) VALUES {}",
            values_placeholders(records.len(), COLUMN_COUNT)
        );

        let mut q = sqlx::query(&query);
        for r in records {
            let d = &r.detection;
            q = q
                .bind(r.detection_id)
                .bind(&r.source_key)
                .bind(&d.camera_id)
                .bind(d.class_probability)
                .bind(d.class_id)
                .bind(d.detected_at)
                .bind(d.saved_at)
                .bind(d.track_point_count)
                .bind(d.intersection_point.0)
                .bind(d.intersection_point.1)
                .bind(d.bounding_box[0])
                .bind(d.bounding_box[1])
                .bind(d.bounding_box[2])
                .bind(d.bounding_box[3])
                .bind(d.frame_timestamp)
                .bind(d.track_id)
                .bind(d.sequence_length)
                .bind(&d.full_image_path)
                .bind(&d.debug_image_path);
        }

        let result = q.execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// Highest persisted detection id, `None` when the table is empty.
    pub async fn max_id(pool: &PgPool) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<DbId>>("SELECT MAX(detection_id) FROM detections")
            .fetch_one(pool)
            .await
    }

    /// Which of `keys` are already stored.
    pub async fn existing_source_keys(
        pool: &PgPool,
        keys: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query_scalar::<_, String>(
            "SELECT source_key FROM detections WHERE source_key = ANY($1)",
        )
        .bind(keys)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DetectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM detections WHERE detection_id = $1");
        sqlx::query_as::<_, DetectionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All detection ids in ascending order.
    pub async fn list_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT detection_id FROM detections ORDER BY detection_id")
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM detections")
            .fetch_one(pool)
            .await
    }

    /// Loudest detections in a `YYYY-MM` month.
    pub async fn loudest_in_month(
        pool: &PgPool,
        month: &str,
        limit: i64,
    ) -> Result<Vec<LoudDetection>, sqlx::Error> {
        sqlx::query_as::<_, LoudDetection>(
            "SELECT d.detection_id, d.detected_at, a.peak_level, d.debug_image_path \
             FROM detections d \
             JOIN acoustic_samples a ON a.detection_id = d.detection_id \
             WHERE to_char(d.detected_at, 'YYYY-MM') = $1 \
             ORDER BY a.peak_level DESC NULLS LAST, d.detection_id \
             LIMIT $2",
        )
        .bind(month)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Loudest detections on one calendar date.
    pub async fn loudest_on_date(
        pool: &PgPool,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<LoudDetection>, sqlx::Error> {
        sqlx::query_as::<_, LoudDetection>(
            "SELECT d.detection_id, d.detected_at, a.peak_level, d.debug_image_path \
             FROM detections d \
             JOIN acoustic_samples a ON a.detection_id = d.detection_id \
             WHERE d.detected_at::date = $1 \
             ORDER BY a.peak_level DESC NULLS LAST, d.detection_id \
             LIMIT $2",
        )
        .bind(date)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
