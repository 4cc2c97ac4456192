//! `roadnoise-core` -- pure domain logic for the traffic-noise ingest.
//!
//! Nothing in this crate touches the database, the filesystem or an
//! async runtime. The ingest binary feeds it raw lines and persists what
//! comes out.

pub mod acoustic;
pub mod batch;
pub mod buckets;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod merge;
pub mod record;
pub mod types;
