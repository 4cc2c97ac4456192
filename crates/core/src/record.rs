//! Record parser: one raw JSON line in, one validated record out.
//!
//! Every line lands in exactly one of four places:
//!
//! - `Err(RecordError::Decode | NotAnObject)` -- not structured data
//! - `Ok(LineOutcome::Excluded)` -- valid, but carries no `snd.res` block
//! - `Err(RecordError::Schema | Field)` -- a required field is missing or
//!   malformed; the detection and its acoustic data are dropped together
//! - `Ok(LineOutcome::Accepted(_))`

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::acoustic::{self, AcousticProfile, RawSound};
use crate::error::CoreError;
use crate::fingerprint::line_fingerprint;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Prefix under which image paths are served to the reporting layer.
pub const IMAGE_PATH_PREFIX: &str = "traffic/";

/// Timestamp layouts written by the camera, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Line is not a JSON object")]
    NotAnObject,

    #[error("Malformed record: {0}")]
    Schema(#[source] serde_json::Error),

    #[error(transparent)]
    Field(#[from] CoreError),
}

impl RecordError {
    /// Decode failures are logged with a line preview, field errors with
    /// the whole raw record.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::NotAnObject)
    }
}

/// Result of parsing a line that decoded successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Accepted(ValidatedRecord),
    /// The record has no acoustic analysis and is not ingested.
    Excluded,
}

// ---------------------------------------------------------------------------
// Raw schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawEvent {
    cam: String,
    probs: f64,
    cls: i32,
    dto: String,
    save_dto: String,
    point_len: i32,
    intersection: Vec<i32>,
    #[serde(rename = "box")]
    bounding_box: Vec<f64>,
    frame_dto: String,
    tid: i64,
    seq_len: i32,
    full_img: String,
    debug_img: String,
    snd: RawSound,
}

// ---------------------------------------------------------------------------
// Validated records
// ---------------------------------------------------------------------------

/// Camera-side fields of one detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub camera_id: String,
    pub class_probability: f64,
    pub class_id: i32,
    pub detected_at: Timestamp,
    pub saved_at: Timestamp,
    pub track_point_count: i32,
    pub intersection_point: (i32, i32),
    /// `x1, y1, x2, y2`.
    pub bounding_box: [f64; 4],
    pub frame_timestamp: Timestamp,
    pub track_id: i64,
    pub sequence_length: i32,
    pub full_image_path: String,
    pub debug_image_path: String,
}

/// A line that passed validation but has no identifier yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    /// Fingerprint of the raw line, see [`line_fingerprint`].
    pub source_key: String,
    pub detection: Detection,
    pub acoustic: AcousticProfile,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse and validate one input line.
pub fn parse_line(line: &str) -> Result<LineOutcome, RecordError> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(RecordError::Decode)?;
    if !value.is_object() {
        return Err(RecordError::NotAnObject);
    }

    let has_analysis = value
        .get("snd")
        .and_then(|snd| snd.get("res"))
        .is_some();
    if !has_analysis {
        return Ok(LineOutcome::Excluded);
    }

    let raw: RawEvent = serde_json::from_value(value).map_err(RecordError::Schema)?;
    let record = validate(raw, line_fingerprint(line))?;
    Ok(LineOutcome::Accepted(record))
}

fn validate(raw: RawEvent, source_key: String) -> Result<ValidatedRecord, CoreError> {
    let intersection_point = match raw.intersection.as_slice() {
        [x, y, ..] => (*x, *y),
        other => {
            return Err(CoreError::Validation(format!(
                "intersection needs 2 coordinates, got {}",
                other.len()
            )))
        }
    };

    let bounding_box = match raw.bounding_box.as_slice() {
        [x1, y1, x2, y2, ..] => [*x1, *y1, *x2, *y2],
        other => {
            return Err(CoreError::Validation(format!(
                "box needs 4 coordinates, got {}",
                other.len()
            )))
        }
    };

    let detection = Detection {
        camera_id: raw.cam,
        class_probability: raw.probs,
        class_id: raw.cls,
        detected_at: parse_timestamp("dto", &raw.dto)?,
        saved_at: parse_timestamp("save_dto", &raw.save_dto)?,
        track_point_count: raw.point_len,
        intersection_point,
        bounding_box,
        frame_timestamp: parse_timestamp("frame_dto", &raw.frame_dto)?,
        track_id: raw.tid,
        sequence_length: raw.seq_len,
        full_image_path: repository_path(&raw.full_img),
        debug_image_path: repository_path(&raw.debug_img),
    };

    let acoustic = acoustic::normalize(&raw.snd)?;

    Ok(ValidatedRecord {
        source_key,
        detection,
        acoustic,
    })
}

/// Parse a camera timestamp in any of the accepted layouts.
pub fn parse_timestamp(field: &str, value: &str) -> Result<Timestamp, CoreError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| CoreError::Validation(format!("{field} is not a timestamp: '{value}'")))
}

/// Replace the first path segment (the sensor's storage root) with
/// [`IMAGE_PATH_PREFIX`]. Paths without a separator are prefixed as-is.
pub fn repository_path(path: &str) -> String {
    let rest = path.split_once('/').map_or(path, |(_, rest)| rest);
    format!("{IMAGE_PATH_PREFIX}{rest}")
}

/// First `max_chars` characters of a line, for log messages.
pub fn preview(line: &str, max_chars: usize) -> &str {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime};

    fn line(dba: &str) -> String {
        format!(
            r#"{{"cam":"cam-07","probs":0.91,"cls":2,"dto":"2025-04-01 08:12:33","save_dto":"2025-04-01 08:12:34","point_len":14,"intersection":[412,388],"box":[100.5,80.0,220.25,190.0],"frame_dto":"2025-04-01 08:12:33","tid":5531,"seq_len":22,"full_img":"mnt/full/2025-04-01/a.jpg","debug_img":"mnt/debug/2025-04-01/a.jpg","snd":{{"snd":"/rec/a.wav","snd_lvl":58.2,"res":{{"ks":1500,"ke":4000,"kd":2500{dba}}}}}}}"#
        )
    }

    fn accepted(line: &str) -> ValidatedRecord {
        match parse_line(line).unwrap() {
            LineOutcome::Accepted(r) => r,
            LineOutcome::Excluded => panic!("line should have been accepted"),
        }
    }

    #[test]
    fn valid_line_is_accepted() {
        let record = accepted(&line(r#","dba":[70.1,65.0]"#));
        let d = &record.detection;

        assert_eq!(d.camera_id, "cam-07");
        assert_eq!(d.class_id, 2);
        assert_eq!(
            d.detected_at,
            NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(8, 12, 33)
                .unwrap()
        );
        assert_eq!(d.intersection_point, (412, 388));
        assert_eq!(d.bounding_box, [100.5, 80.0, 220.25, 190.0]);
        assert_eq!(d.track_id, 5531);
        assert_eq!(d.full_image_path, "traffic/full/2025-04-01/a.jpg");
        assert_eq!(d.debug_image_path, "traffic/debug/2025-04-01/a.jpg");

        assert_eq!(record.acoustic.peak_level, Some(70.1));
        assert_eq!(record.acoustic.samples[1], Some(65.0));
        assert!(record.acoustic.samples[2..].iter().all(Option::is_none));
        assert_eq!(
            record.acoustic.key_start_offset,
            NaiveTime::from_hms_milli_opt(0, 0, 1, 500).unwrap()
        );
        assert_eq!(record.source_key.len(), 64);
    }

    #[test]
    fn invalid_json_is_a_decode_failure() {
        let err = parse_line("{\"cam\": \"cam-07\", ").unwrap_err();
        assert_matches!(err, RecordError::Decode(_));
        assert!(err.is_decode_failure());
    }

    #[test]
    fn non_object_is_a_decode_failure() {
        assert_matches!(parse_line("[1, 2, 3]"), Err(RecordError::NotAnObject));
    }

    #[test]
    fn record_without_analysis_is_excluded() {
        let no_res = r#"{"cam":"cam-07","snd":{"snd":"/rec/a.wav","snd_lvl":58.2}}"#;
        assert_eq!(parse_line(no_res).unwrap(), LineOutcome::Excluded);

        let no_snd = r#"{"cam":"cam-07"}"#;
        assert_eq!(parse_line(no_snd).unwrap(), LineOutcome::Excluded);
    }

    #[test]
    fn null_offsets_and_series_read_as_missing() {
        let nulls =
            line(r#","dba":null"#).replace(r#""ks":1500,"ke":4000"#, r#""ks":null,"ke":null"#);
        let record = accepted(&nulls);

        assert_eq!(record.acoustic.key_start_offset, NaiveTime::default());
        assert_eq!(record.acoustic.key_end_offset, NaiveTime::default());
        assert!(record.acoustic.samples.iter().all(Option::is_none));
        assert_eq!(record.acoustic.peak_level, None);
    }

    #[test]
    fn missing_required_field_is_a_schema_error() {
        let without_tid = line("").replace(r#""tid":5531,"#, "");
        let err = parse_line(&without_tid).unwrap_err();
        assert_matches!(err, RecordError::Schema(_));
        assert!(!err.is_decode_failure());
    }

    #[test]
    fn short_intersection_is_a_field_error() {
        let short = line("").replace("[412,388]", "[412]");
        assert_matches!(parse_line(&short), Err(RecordError::Field(_)));
    }

    #[test]
    fn oversized_sample_series_rejects_whole_record() {
        let dba = vec!["60.0"; 45].join(",");
        let long = line(&format!(r#","dba":[{dba}]"#));
        assert_matches!(parse_line(&long), Err(RecordError::Field(_)));
    }

    #[test]
    fn bad_timestamp_is_a_field_error() {
        let bad = line("").replace(r#""dto":"2025-04-01 08:12:33""#, r#""dto":"yesterday""#);
        assert_matches!(parse_line(&bad), Err(RecordError::Field(_)));
    }

    #[test]
    fn fractional_and_iso_timestamps_parse() {
        assert!(parse_timestamp("dto", "2025-04-01 08:12:33.250").is_ok());
        assert!(parse_timestamp("dto", "2025-04-01T08:12:33").is_ok());
    }

    #[test]
    fn repository_path_replaces_root_segment() {
        assert_eq!(repository_path("data/x/y.jpg"), "traffic/x/y.jpg");
        assert_eq!(repository_path("/abs/y.jpg"), "traffic/abs/y.jpg");
        assert_eq!(repository_path("y.jpg"), "traffic/y.jpg");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("abcdef", 3), "abc");
        assert_eq!(preview("ab", 3), "ab");
        assert_eq!(preview("日本語テキスト", 2), "日本");
    }
}
