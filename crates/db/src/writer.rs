//! Batch writer: persists one run as independent transactional groups.
//!
//! The four groups (detections, acoustic samples, monthly buckets, daily
//! buckets) each run in their own transaction. A failing group is rolled
//! back and reported; the remaining groups are still attempted, so a run
//! can end in partial success.

use roadnoise_core::batch::IngestedRecord;
use roadnoise_core::buckets::{BucketAggregates, BucketMap, BucketSummary, DailyKey, MonthlyKey};
use roadnoise_core::merge::merge_buckets;
use serde::Serialize;

use crate::repositories::{AcousticRepo, DailyBucketRepo, DetectionRepo, MonthlyBucketRepo};
use crate::DbPool;

/// Default rows per multi-row INSERT. The acoustic table binds 37
/// parameters per row, so this stays well under the 65535 limit.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Largest chunk that keeps the acoustic INSERT under the bind limit.
pub const MAX_CHUNK_SIZE: usize = 1700;

// ---------------------------------------------------------------------------
// Write groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteGroup {
    Detections,
    AcousticSamples,
    MonthlyBuckets,
    DailyBuckets,
}

impl WriteGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detections => "detections",
            Self::AcousticSamples => "acoustic_samples",
            Self::MonthlyBuckets => "monthly_buckets",
            Self::DailyBuckets => "daily_buckets",
        }
    }
}

impl std::fmt::Display for WriteGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bucket rows are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketWriteMode {
    /// Tables were cleared; insert the freshly computed buckets.
    Replace,
    /// Fold the batch into the stored buckets.
    Merge,
}

/// Outcome of one write group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    pub group: WriteGroup,
    pub rows_attempted: usize,
    /// Rows written on success, the database error text on failure.
    pub result: Result<u64, String>,
}

impl GroupOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    pub outcomes: Vec<GroupOutcome>,
}

impl WriteReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(GroupOutcome::succeeded)
    }

    pub fn failed_groups(&self) -> Vec<WriteGroup> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.group)
            .collect()
    }

    pub fn outcome(&self, group: WriteGroup) -> Option<&GroupOutcome> {
        self.outcomes.iter().find(|o| o.group == group)
    }

    fn record(
        &mut self,
        group: WriteGroup,
        rows_attempted: usize,
        result: Result<u64, sqlx::Error>,
    ) {
        let result = match result {
            Ok(written) => {
                tracing::info!(group = %group, rows = written, "Write group committed");
                Ok(written)
            }
            Err(e) => {
                tracing::error!(
                    group = %group,
                    rows_attempted,
                    error = %e,
                    "Write group failed and was rolled back",
                );
                Err(e.to_string())
            }
        };
        self.outcomes.push(GroupOutcome {
            group,
            rows_attempted,
            result,
        });
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

pub struct BatchWriter<'a> {
    pool: &'a DbPool,
    chunk_size: usize,
}

impl<'a> BatchWriter<'a> {
    /// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn new(pool: &'a DbPool, chunk_size: usize) -> Self {
        Self {
            pool,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    /// Write records and buckets. Never fails as a whole; inspect the
    /// returned report for per-group results.
    pub async fn write(
        &self,
        records: &[IngestedRecord],
        aggregates: &BucketAggregates,
        mode: BucketWriteMode,
    ) -> WriteReport {
        let mut report = WriteReport::default();

        report.record(
            WriteGroup::Detections,
            records.len(),
            self.write_detections(records).await,
        );
        report.record(
            WriteGroup::AcousticSamples,
            records.len(),
            self.write_acoustics(records).await,
        );
        report.record(
            WriteGroup::MonthlyBuckets,
            aggregates.monthly.len(),
            self.write_monthly(&aggregates.monthly, mode).await,
        );
        report.record(
            WriteGroup::DailyBuckets,
            aggregates.daily.len(),
            self.write_daily(&aggregates.daily, mode).await,
        );

        report
    }

    // Dropping an uncommitted transaction rolls it back, so every `?`
    // below leaves its group untouched.

    async fn write_detections(&self, records: &[IngestedRecord]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for chunk in records.chunks(self.chunk_size) {
            written += DetectionRepo::insert_batch(&mut *tx, chunk).await?;
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn write_acoustics(&self, records: &[IngestedRecord]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for chunk in records.chunks(self.chunk_size) {
            written += AcousticRepo::insert_batch(&mut *tx, chunk).await?;
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn write_monthly(
        &self,
        delta: &BucketMap<MonthlyKey>,
        mode: BucketWriteMode,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<(MonthlyKey, BucketSummary)> = match mode {
            BucketWriteMode::Replace => delta.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            BucketWriteMode::Merge => {
                let keys: Vec<MonthlyKey> = delta.keys().cloned().collect();
                let persisted = MonthlyBucketRepo::find_for_update(&mut *tx, &keys).await?;
                merge_buckets(persisted, delta).into_iter().collect()
            }
        };

        let mut written = 0;
        for chunk in rows.chunks(self.chunk_size) {
            written += match mode {
                BucketWriteMode::Replace => MonthlyBucketRepo::insert_batch(&mut *tx, chunk).await?,
                BucketWriteMode::Merge => MonthlyBucketRepo::upsert_batch(&mut *tx, chunk).await?,
            };
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn write_daily(
        &self,
        delta: &BucketMap<DailyKey>,
        mode: BucketWriteMode,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<(DailyKey, BucketSummary)> = match mode {
            BucketWriteMode::Replace => delta.iter().map(|(k, v)| (*k, *v)).collect(),
            BucketWriteMode::Merge => {
                let keys: Vec<DailyKey> = delta.keys().copied().collect();
                let persisted = DailyBucketRepo::find_for_update(&mut *tx, &keys).await?;
                merge_buckets(persisted, delta).into_iter().collect()
            }
        };

        let mut written = 0;
        for chunk in rows.chunks(self.chunk_size) {
            written += match mode {
                BucketWriteMode::Replace => DailyBucketRepo::insert_batch(&mut *tx, chunk).await?,
                BucketWriteMode::Merge => DailyBucketRepo::upsert_batch(&mut *tx, chunk).await?,
            };
        }

        tx.commit().await?;
        Ok(written)
    }
}
