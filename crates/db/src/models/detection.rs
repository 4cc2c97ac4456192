//! Detection rows.

use roadnoise_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A stored detection.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DetectionRow {
    pub detection_id: DbId,
    pub source_key: String,
    pub camera_id: String,
    pub class_probability: f64,
    pub class_id: i32,
    pub detected_at: Timestamp,
    pub saved_at: Timestamp,
    pub track_point_count: i32,
    pub intersection_x: i32,
    pub intersection_y: i32,
    pub box_x1: f64,
    pub box_y1: f64,
    pub box_x2: f64,
    pub box_y2: f64,
    pub frame_timestamp: Timestamp,
    pub track_id: i64,
    pub sequence_length: i32,
    pub full_image_path: String,
    pub debug_image_path: String,
}

/// Detection joined with its peak level, for "loudest vehicles" listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LoudDetection {
    pub detection_id: DbId,
    pub detected_at: Timestamp,
    pub peak_level: Option<f64>,
    pub debug_image_path: String,
}
