use roadnoise_core::types::DbId;
use roadnoise_db::writer::WriteReport;
use serde::Serialize;

use crate::config::IngestMode;
use crate::source::ParseStats;

/// Summary of one ingest run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub mode: &'static str,
    pub parse: ParseStats,
    /// Records dropped because their line was already ingested.
    pub duplicates: usize,
    pub accepted: usize,
    pub first_id: Option<DbId>,
    pub last_id: Option<DbId>,
    /// Id the following run will start from.
    pub next_id: DbId,
    pub write: WriteReport,
}

impl IngestReport {
    pub fn new(mode: IngestMode, parse: ParseStats, next_id: DbId) -> Self {
        Self {
            mode: mode.as_str(),
            parse,
            duplicates: 0,
            accepted: 0,
            first_id: None,
            last_id: None,
            next_id,
            write: WriteReport::default(),
        }
    }

    pub fn fully_written(&self) -> bool {
        self.write.all_succeeded()
    }

    /// Emit the run summary at info level, or at warn level when a write
    /// group failed. Both carry the full set of counters.
    pub fn log(&self) {
        let failed: Vec<&str> = self.write.failed_groups().iter().map(|g| g.as_str()).collect();

        if failed.is_empty() {
            tracing::info!(
                mode = self.mode,
                files = self.parse.files_read,
                files_skipped = self.parse.files_skipped,
                lines = self.parse.lines_read,
                accepted = self.accepted,
                duplicates = self.duplicates,
                excluded = self.parse.excluded,
                decode_failures = self.parse.decode_failures,
                field_errors = self.parse.field_errors,
                first_id = ?self.first_id,
                last_id = ?self.last_id,
                next_id = self.next_id,
                "Ingest run complete",
            );
        } else {
            tracing::warn!(
                mode = self.mode,
                files = self.parse.files_read,
                files_skipped = self.parse.files_skipped,
                lines = self.parse.lines_read,
                accepted = self.accepted,
                duplicates = self.duplicates,
                excluded = self.parse.excluded,
                decode_failures = self.parse.decode_failures,
                field_errors = self.parse.field_errors,
                first_id = ?self.first_id,
                last_id = ?self.last_id,
                next_id = self.next_id,
                failed_groups = ?failed,
                "Ingest run finished with failed write groups",
            );
        }
    }
}
