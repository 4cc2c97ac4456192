//! Acoustic normalisation: fixed-width sample encoding and peak level.
//!
//! The sound sensor reports a variable-length dBA series per detection.
//! Storage wants exactly [`SAMPLE_WIDTH`] positions, right-padded with
//! `None`, plus the peak of whatever was actually measured.

use std::path::Path;

use chrono::{Duration, NaiveTime};
use serde::Deserialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of sample columns stored per acoustic record.
pub const SAMPLE_WIDTH: usize = 30;

/// Offsets are wrapped into a single day.
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// The `snd` sub-object of a raw event line.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSound {
    /// Path of the recording on the sensor host.
    pub snd: String,
    pub snd_lvl: f64,
    pub res: RawSoundResult,
}

/// The `snd.res` analysis block. `ks`, `ke` and `dba` may be missing or
/// `null`; both read as `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSoundResult {
    #[serde(default)]
    pub ks: Option<f64>,
    #[serde(default)]
    pub ke: Option<f64>,
    pub kd: i32,
    #[serde(default)]
    pub dba: Option<Vec<Option<f64>>>,
}

// ---------------------------------------------------------------------------
// Normalised output
// ---------------------------------------------------------------------------

/// Acoustic measurement for one detection, ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticProfile {
    /// File name of the recording, without its directory.
    pub source_file: String,
    pub level: f64,
    pub key_start_offset: NaiveTime,
    pub key_end_offset: NaiveTime,
    pub key_duration: i32,
    pub samples: [Option<f64>; SAMPLE_WIDTH],
    /// Maximum of the present samples; `None` when every slot is empty.
    pub peak_level: Option<f64>,
}

/// Build an [`AcousticProfile`] from the raw `snd` block.
///
/// Fails when the sample series is longer than [`SAMPLE_WIDTH`].
pub fn normalize(raw: &RawSound) -> Result<AcousticProfile, CoreError> {
    let series = raw.res.dba.as_deref().unwrap_or(&[]);
    let samples = pad_samples(series)?;

    Ok(AcousticProfile {
        source_file: file_name(&raw.snd),
        level: raw.snd_lvl,
        key_start_offset: offset_from_millis(millis(raw.res.ks)),
        key_end_offset: offset_from_millis(millis(raw.res.ke)),
        key_duration: raw.res.kd,
        peak_level: peak_level(&samples),
        samples,
    })
}

/// Right-pad a sample series with `None` to exactly [`SAMPLE_WIDTH`].
pub fn pad_samples(series: &[Option<f64>]) -> Result<[Option<f64>; SAMPLE_WIDTH], CoreError> {
    if series.len() > SAMPLE_WIDTH {
        return Err(CoreError::Validation(format!(
            "dba series has {} samples, at most {SAMPLE_WIDTH} are allowed",
            series.len()
        )));
    }

    let mut samples = [None; SAMPLE_WIDTH];
    samples[..series.len()].copy_from_slice(series);
    Ok(samples)
}

/// Maximum of the present values, or `None` if none are present.
pub fn peak_level(samples: &[Option<f64>]) -> Option<f64> {
    samples
        .iter()
        .flatten()
        .copied()
        .fold(None, |peak, v| Some(peak.map_or(v, |p: f64| p.max(v))))
}

/// Convert a millisecond offset into a time of day, wrapping modulo 24h.
pub fn offset_from_millis(ms: i64) -> NaiveTime {
    NaiveTime::default() + Duration::milliseconds(ms.rem_euclid(MILLIS_PER_DAY))
}

/// Missing offsets count as zero.
fn millis(value: Option<f64>) -> i64 {
    value.map_or(0, |v| v.round() as i64)
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn raw(dba: Option<Vec<Option<f64>>>, ks: Option<f64>) -> RawSound {
        RawSound {
            snd: "/data/snd/2025-04-01/08-12-33.wav".to_string(),
            snd_lvl: 61.5,
            res: RawSoundResult {
                ks,
                ke: Some(4200.0),
                kd: 2700,
                dba,
            },
        }
    }

    // -- padding --------------------------------------------------------------

    #[test]
    fn padding_always_yields_thirty_positions() {
        for len in [0usize, 5, 30] {
            let series = vec![Some(50.0); len];
            let padded = pad_samples(&series).unwrap();
            assert_eq!(padded.len(), SAMPLE_WIDTH);
            assert_eq!(padded.iter().filter(|s| s.is_some()).count(), len);
        }
    }

    #[test]
    fn oversized_series_is_rejected() {
        let series = vec![Some(50.0); 45];
        assert_matches!(pad_samples(&series), Err(CoreError::Validation(_)));
    }

    // -- peak -----------------------------------------------------------------

    #[test]
    fn peak_ignores_missing_samples() {
        let samples = [None, Some(62.0), None, Some(71.5), Some(40.0)];
        assert_eq!(peak_level(&samples), Some(71.5));
    }

    #[test]
    fn peak_of_all_missing_is_none() {
        assert_eq!(peak_level(&[None; SAMPLE_WIDTH]), None);
        assert_eq!(peak_level(&[]), None);
    }

    // -- offsets --------------------------------------------------------------

    #[test]
    fn offset_is_time_past_midnight() {
        let t = offset_from_millis(1500);
        assert_eq!(t, NaiveTime::from_hms_milli_opt(0, 0, 1, 500).unwrap());
    }

    #[test]
    fn offset_wraps_past_one_day() {
        let t = offset_from_millis(MILLIS_PER_DAY + 61_000);
        assert_eq!(t, NaiveTime::from_hms_opt(0, 1, 1).unwrap());
    }

    #[test]
    fn negative_offset_wraps_backwards() {
        let t = offset_from_millis(-1000);
        assert_eq!(t, NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    // -- normalize ------------------------------------------------------------

    #[test]
    fn normalize_pads_and_derives_peak() {
        let profile = normalize(&raw(Some(vec![Some(70.1), Some(65.0)]), Some(1500.0))).unwrap();

        assert_eq!(profile.peak_level, Some(70.1));
        assert_eq!(profile.samples[0], Some(70.1));
        assert_eq!(profile.samples[1], Some(65.0));
        assert!(profile.samples[2..].iter().all(Option::is_none));
        assert_eq!(
            profile.key_start_offset,
            NaiveTime::from_hms_milli_opt(0, 0, 1, 500).unwrap()
        );
        assert_eq!(profile.source_file, "08-12-33.wav");
        assert_eq!(profile.key_duration, 2700);
    }

    #[test]
    fn missing_series_and_offset_use_defaults() {
        let profile = normalize(&raw(None, None)).unwrap();
        assert_eq!(profile.peak_level, None);
        assert_eq!(profile.key_start_offset, NaiveTime::default());
        assert!(profile.samples.iter().all(Option::is_none));
    }
}
