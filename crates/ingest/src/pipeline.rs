//! Run orchestration for the bulk and incremental modes.
//!
//! Both modes share the same stages: discover and parse input, assign
//! identifiers, aggregate buckets, write. They differ only in where the
//! identifier sequence starts, which lines count as already ingested,
//! and whether buckets replace or merge with storage.

use std::collections::HashSet;
use std::path::Path;

use roadnoise_core::batch::assign_ids;
use roadnoise_core::buckets::aggregate;
use roadnoise_core::identity::IdAllocator;
use roadnoise_db::repositories::DetectionRepo;
use roadnoise_db::writer::BatchWriter;
use roadnoise_db::DbPool;

use crate::config::{IngestConfig, IngestMode};
use crate::error::IngestError;
use crate::report::IngestReport;
use crate::source::{discover_files, parse_files};

/// Run one ingest pass in the configured mode.
pub async fn run(pool: &DbPool, config: &IngestConfig) -> Result<IngestReport, IngestError> {
    run_mode(
        pool,
        config.mode,
        config.input_dir(),
        &config.file_marker,
        config.chunk_size,
    )
    .await
}

/// Run one ingest pass reading from `input_dir`.
///
/// Fails only when the directory cannot be listed or storage cannot be
/// prepared. Write-group failures are reported, not returned.
pub async fn run_mode(
    pool: &DbPool,
    mode: IngestMode,
    input_dir: &Path,
    file_marker: &str,
    chunk_size: usize,
) -> Result<IngestReport, IngestError> {
    let files = discover_files(input_dir, file_marker).map_err(|source| IngestError::InputDir {
        path: input_dir.to_path_buf(),
        source,
    })?;
    tracing::info!(
        mode = %mode,
        dir = %input_dir.display(),
        files = files.len(),
        "Reading input files",
    );

    let parsed = parse_files(&files);

    let (allocator, already_ingested) = match mode {
        IngestMode::Bulk => {
            roadnoise_db::clear_ingest_tables(pool).await?;
            (IdAllocator::fresh(), HashSet::new())
        }
        IngestMode::Incremental => {
            let max_id = DetectionRepo::max_id(pool).await?;
            let keys: Vec<String> = parsed.records.iter().map(|r| r.source_key.clone()).collect();
            let existing = DetectionRepo::existing_source_keys(pool, &keys).await?;
            (IdAllocator::continuing_after(max_id), existing)
        }
    };

    let batch = assign_ids(parsed.records, allocator, &already_ingested);
    let mut report = IngestReport::new(mode, parsed.stats, batch.allocator.peek());
    report.duplicates = batch.duplicates;
    report.accepted = batch.records.len();
    report.first_id = batch.first_id();
    report.last_id = batch.last_id();

    if batch.records.is_empty() {
        tracing::info!(mode = %mode, "No new records to write");
        return Ok(report);
    }

    let aggregates = aggregate(&batch.records);
    report.write = BatchWriter::new(pool, chunk_size)
        .write(&batch.records, &aggregates, mode.bucket_write_mode())
        .await;

    Ok(report)
}
