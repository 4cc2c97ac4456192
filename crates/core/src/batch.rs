//! Turning validated records into identified, paired records.

use std::collections::HashSet;

use crate::acoustic::AcousticProfile;
use crate::identity::IdAllocator;
use crate::record::{Detection, ValidatedRecord};
use crate::types::DbId;

/// A detection and its acoustic measurement under one identifier.
///
/// The pair is written as two rows but is never split: a record that
/// fails validation loses both halves.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    pub detection_id: DbId,
    pub source_key: String,
    pub detection: Detection,
    pub acoustic: AcousticProfile,
}

/// Output of [`assign_ids`].
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub records: Vec<IngestedRecord>,
    /// Records skipped because their source key was already ingested or
    /// appeared earlier in the same batch.
    pub duplicates: usize,
    /// Allocator state after the batch, for reporting and chaining.
    pub allocator: IdAllocator,
}

impl PreparedBatch {
    pub fn first_id(&self) -> Option<DbId> {
        self.records.first().map(|r| r.detection_id)
    }

    pub fn last_id(&self) -> Option<DbId> {
        self.records.last().map(|r| r.detection_id)
    }
}

/// Drop duplicates and assign identifiers in input order.
///
/// `already_ingested` holds the source keys already present in storage.
/// Duplicates are removed before allocation so they never consume an id.
pub fn assign_ids(
    validated: Vec<ValidatedRecord>,
    mut allocator: IdAllocator,
    already_ingested: &HashSet<String>,
) -> PreparedBatch {
    let mut seen: HashSet<String> = HashSet::with_capacity(validated.len());
    let mut records = Vec::with_capacity(validated.len());
    let mut duplicates = 0;

    for record in validated {
        if already_ingested.contains(&record.source_key) || !seen.insert(record.source_key.clone())
        {
            duplicates += 1;
            continue;
        }

        records.push(IngestedRecord {
            detection_id: allocator.allocate(),
            source_key: record.source_key,
            detection: record.detection,
            acoustic: record.acoustic,
        });
    }

    PreparedBatch {
        records,
        duplicates,
        allocator,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::acoustic::SAMPLE_WIDTH;
    use crate::types::Timestamp;

    pub fn timestamp(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    pub fn validated(key: &str, detected_at: Timestamp, peak: Option<f64>) -> ValidatedRecord {
        let mut samples = [None; SAMPLE_WIDTH];
        samples[0] = peak;
        ValidatedRecord {
            source_key: key.to_string(),
            detection: Detection {
                camera_id: "cam-01".to_string(),
                class_probability: 0.9,
                class_id: 2,
                detected_at,
                saved_at: detected_at,
                track_point_count: 10,
                intersection_point: (1, 2),
                bounding_box: [0.0, 0.0, 10.0, 10.0],
                frame_timestamp: detected_at,
                track_id: 7,
                sequence_length: 12,
                full_image_path: "traffic/full.jpg".to_string(),
                debug_image_path: "traffic/debug.jpg".to_string(),
            },
            acoustic: AcousticProfile {
                source_file: "a.wav".to_string(),
                level: 55.0,
                key_start_offset: NaiveTime::default(),
                key_end_offset: NaiveTime::default(),
                key_duration: 1000,
                samples,
                peak_level: peak,
            },
        }
    }

    pub fn ingested(id: DbId, detected_at: Timestamp, peak: Option<f64>) -> IngestedRecord {
        let v = validated(&format!("key-{id}"), detected_at, peak);
        IngestedRecord {
            detection_id: id,
            source_key: v.source_key,
            detection: v.detection,
            acoustic: v.acoustic,
        }
    }
}
