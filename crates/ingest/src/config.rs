use std::path::{Path, PathBuf};

use roadnoise_db::writer::{BucketWriteMode, DEFAULT_CHUNK_SIZE};

/// Substring that marks rotated camera log files.
pub const DEFAULT_FILE_MARKER: &str = ".txt.";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Clear storage and rebuild everything from the logs directory.
    Bulk,
    /// Append new events and merge them into the stored buckets.
    Incremental,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Incremental => "incremental",
        }
    }

    /// Parse a mode name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bulk" => Some(Self::Bulk),
            "incremental" => Some(Self::Incremental),
            _ => None,
        }
    }

    pub fn bucket_write_mode(&self) -> BucketWriteMode {
        match self {
            Self::Bulk => BucketWriteMode::Replace,
            Self::Incremental => BucketWriteMode::Merge,
        }
    }
}

impl std::fmt::Display for IngestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Ingest configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database_url: String,
    pub mode: IngestMode,
    /// Input directory for bulk runs.
    pub logs_dir: PathBuf,
    /// Input directory for incremental runs.
    pub newdata_dir: PathBuf,
    /// Only files whose name contains this are read.
    pub file_marker: String,
    pub max_connections: u32,
    /// Rows per multi-row INSERT.
    pub chunk_size: usize,
}

impl IngestConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var              | Default        |
    /// |----------------------|----------------|
    /// | `DATABASE_URL`       | required       |
    /// | `INGEST_MODE`        | `incremental`  |
    /// | `LOGS_DIR`           | `./logs`       |
    /// | `NEWDATA_DIR`        | `./newdata`    |
    /// | `INGEST_FILE_MARKER` | `.txt.`        |
    /// | `DB_MAX_CONNECTIONS` | `5`            |
    /// | `INSERT_CHUNK_SIZE`  | `500`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let mode = match lookup("INGEST_MODE") {
            Some(value) => parse_mode("INGEST_MODE", value)?,
            None => IngestMode::Incremental,
        };

        let logs_dir = PathBuf::from(lookup("LOGS_DIR").unwrap_or_else(|| "./logs".into()));
        let newdata_dir =
            PathBuf::from(lookup("NEWDATA_DIR").unwrap_or_else(|| "./newdata".into()));

        let file_marker = lookup("INGEST_FILE_MARKER").unwrap_or_else(|| DEFAULT_FILE_MARKER.into());

        let max_connections = parse_number(
            "DB_MAX_CONNECTIONS",
            lookup("DB_MAX_CONNECTIONS"),
            DEFAULT_MAX_CONNECTIONS,
        )?;
        let chunk_size = parse_number(
            "INSERT_CHUNK_SIZE",
            lookup("INSERT_CHUNK_SIZE"),
            DEFAULT_CHUNK_SIZE,
        )?;

        Ok(Self {
            database_url,
            mode,
            logs_dir,
            newdata_dir,
            file_marker,
            max_connections,
            chunk_size,
        })
    }

    /// Apply a mode given on the command line, if any.
    pub fn with_mode_override(mut self, arg: Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = arg {
            self.mode = parse_mode("mode argument", value)?;
        }
        Ok(self)
    }

    /// The directory the configured mode reads from.
    pub fn input_dir(&self) -> &Path {
        match self.mode {
            IngestMode::Bulk => &self.logs_dir,
            IngestMode::Incremental => &self.newdata_dir,
        }
    }
}

fn parse_mode(var: &'static str, value: String) -> Result<IngestMode, ConfigError> {
    IngestMode::from_str(&value).ok_or(ConfigError::Invalid { var, value })
}

/// Parse a positive number, falling back to `default` when unset.
fn parse_number<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = IngestConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap();

        assert_eq!(config.mode, IngestMode::Incremental);
        assert_eq!(config.input_dir(), Path::new("./newdata"));
        assert_eq!(config.file_marker, ".txt.");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = IngestConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn bulk_mode_reads_logs_dir() {
        let config = IngestConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("INGEST_MODE", "Bulk"),
            ("LOGS_DIR", "/var/log/cam"),
        ]))
        .unwrap();

        assert_eq!(config.mode, IngestMode::Bulk);
        assert_eq!(config.input_dir(), Path::new("/var/log/cam"));
        assert_eq!(config.mode.bucket_write_mode(), BucketWriteMode::Replace);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, value) in [
            ("INGEST_MODE", "sometimes"),
            ("INSERT_CHUNK_SIZE", "0"),
            ("INSERT_CHUNK_SIZE", "lots"),
            ("DB_MAX_CONNECTIONS", "-1"),
        ] {
            let result =
                IngestConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), (var, value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{var}={value} should be rejected"
            );
        }
    }

    #[test]
    fn command_line_mode_overrides_environment() {
        let config = IngestConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")]))
            .unwrap()
            .with_mode_override(Some("bulk".into()))
            .unwrap();
        assert_eq!(config.mode, IngestMode::Bulk);

        let unchanged = config.clone().with_mode_override(None).unwrap();
        assert_eq!(unchanged.mode, IngestMode::Bulk);
    }

    #[test]
    fn mode_round_trip() {
        for mode in [IngestMode::Bulk, IngestMode::Incremental] {
            assert_eq!(IngestMode::from_str(mode.as_str()), Some(mode));
            assert_eq!(format!("{mode}"), mode.as_str());
        }
    }
}
