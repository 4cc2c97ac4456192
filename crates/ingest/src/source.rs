//! Input discovery and line parsing.
//!
//! Files are read in name order, one JSON event per line. A bad line is
//! logged and counted, never fatal; an unreadable file is skipped.

use std::path::{Path, PathBuf};

use roadnoise_core::record::{parse_line, preview, LineOutcome, ValidatedRecord};
use serde::Serialize;

/// Characters of a malformed line kept in the log message.
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub path: PathBuf,
}

/// Line-level counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub files_read: usize,
    pub files_skipped: usize,
    pub lines_read: usize,
    pub decode_failures: usize,
    pub field_errors: usize,
    /// Records without acoustic analysis.
    pub excluded: usize,
    pub validated: usize,
}

#[derive(Debug, Default)]
pub struct ParsedInput {
    pub records: Vec<ValidatedRecord>,
    pub stats: ParseStats,
}

/// List regular files in `dir` whose name contains `marker`, sorted by name.
pub fn discover_files(dir: &Path, marker: &str) -> std::io::Result<Vec<InputFile>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(marker) {
            files.push(InputFile {
                name,
                path: entry.path(),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Non-empty lines of a file body, with any trailing `\r` removed.
pub fn content_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

/// Read and parse every file, in order.
pub fn parse_files(files: &[InputFile]) -> ParsedInput {
    let mut parsed = ParsedInput::default();

    for file in files {
        let contents = match std::fs::read_to_string(&file.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(file = %file.name, error = %e, "Skipping unreadable input file");
                parsed.stats.files_skipped += 1;
                continue;
            }
        };

        let lines_before = parsed.stats.lines_read;
        let validated_before = parsed.stats.validated;
        parse_contents(&file.name, &contents, &mut parsed);
        parsed.stats.files_read += 1;
        tracing::info!(
            file = %file.name,
            lines = parsed.stats.lines_read - lines_before,
            validated = parsed.stats.validated - validated_before,
            "Parsed input file",
        );
    }

    parsed
}

/// Parse one file body into `parsed`, logging each rejected line.
pub fn parse_contents(file: &str, contents: &str, parsed: &mut ParsedInput) {
    for line in content_lines(contents) {
        parsed.stats.lines_read += 1;

        match parse_line(line) {
            Ok(LineOutcome::Accepted(record)) => {
                parsed.stats.validated += 1;
                parsed.records.push(record);
            }
            Ok(LineOutcome::Excluded) => parsed.stats.excluded += 1,
            Err(e) if e.is_decode_failure() => {
                parsed.stats.decode_failures += 1;
                tracing::warn!(
                    file,
                    line = preview(line, PREVIEW_CHARS),
                    error = %e,
                    "Skipping undecodable line",
                );
            }
            Err(e) => {
                parsed.stats.field_errors += 1;
                tracing::warn!(file, record = line, error = %e, "Skipping invalid record");
            }
        }
    }
}
