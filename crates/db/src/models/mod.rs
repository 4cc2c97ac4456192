//! Row structs for the ingest tables.
//!
//! Writes go straight from `roadnoise_core` records; these types are what
//! the read-side queries return.

pub mod acoustic;
pub mod bucket;
pub mod detection;
