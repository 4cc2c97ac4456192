//! Repository for the `acoustic_samples` table.

use roadnoise_core::acoustic::SAMPLE_WIDTH;
use roadnoise_core::batch::IngestedRecord;
use roadnoise_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use super::values_placeholders;
use crate::models::acoustic::{sample_columns, AcousticSampleRow};

/// Non-sample columns, in bind order, before the thirty `dba` columns.
const LEADING_COLUMNS: &str = "\
    detection_id, source_file, level, key_start_offset, key_end_offset, key_duration";

/// Leading columns + samples + `peak_level`.
const COLUMN_COUNT: usize = 6 + SAMPLE_WIDTH + 1;

fn columns() -> String {
    format!("{LEADING_COLUMNS}, {}, peak_level", sample_columns())
}

/// Provides query operations for acoustic samples.
pub struct AcousticRepo;

impl AcousticRepo {
    /// Insert the acoustic half of a chunk of records.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        records: &[IngestedRecord],
    ) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "INSERT INTO acoustic_samples ({}) VALUES {}",
            columns(),
            values_placeholders(records.len(), COLUMN_COUNT)
        );

        let mut q = sqlx::query(&query);
        for r in records {
            let a = &r.acoustic;
            q = q
                .bind(r.detection_id)
                .bind(&a.source_file)
                .bind(a.level)
                .bind(a.key_start_offset)
                .bind(a.key_end_offset)
                .bind(a.key_duration);
            for sample in a.samples {
                q = q.bind(sample);
            }
            q = q.bind(a.peak_level);
        }

        let result = q.execute(conn).await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_detection(
        pool: &PgPool,
        detection_id: DbId,
    ) -> Result<Option<AcousticSampleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM acoustic_samples WHERE detection_id = $1",
            columns()
        );
        sqlx::query_as::<_, AcousticSampleRow>(&query)
            .bind(detection_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM acoustic_samples")
            .fetch_one(pool)
            .await
    }
}
