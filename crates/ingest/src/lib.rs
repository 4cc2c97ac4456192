//! `roadnoise-ingest` -- reads camera event logs and loads them into
//! PostgreSQL, either as a full rebuild or as an incremental append.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod source;
