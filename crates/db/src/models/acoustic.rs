//! Acoustic sample rows.
//!
//! The thirty sample columns (`dba1`..`dba30`) are read back into a
//! fixed-size array, so `FromRow` is implemented by hand.

use chrono::NaiveTime;
use roadnoise_core::acoustic::SAMPLE_WIDTH;
use roadnoise_core::types::DbId;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// Column name of the sample at zero-based `index`.
pub fn sample_column(index: usize) -> String {
    format!("dba{}", index + 1)
}

/// Comma-separated `dba1, ..., dba30`.
pub fn sample_columns() -> String {
    (0..SAMPLE_WIDTH)
        .map(sample_column)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Serialize)]
pub struct AcousticSampleRow {
    pub detection_id: DbId,
    pub source_file: String,
    pub level: f64,
    pub key_start_offset: NaiveTime,
    pub key_end_offset: NaiveTime,
    pub key_duration: i32,
    pub samples: Vec<Option<f64>>,
    pub peak_level: Option<f64>,
}

impl<'r> FromRow<'r, PgRow> for AcousticSampleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let samples = (0..SAMPLE_WIDTH)
            .map(|i| row.try_get::<Option<f64>, _>(sample_column(i).as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            detection_id: row.try_get("detection_id")?,
            source_file: row.try_get("source_file")?,
            level: row.try_get("level")?,
            key_start_offset: row.try_get("key_start_offset")?,
            key_end_offset: row.try_get("key_end_offset")?,
            key_duration: row.try_get("key_duration")?,
            samples,
            peak_level: row.try_get("peak_level")?,
        })
    }
}
