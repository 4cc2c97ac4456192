/// Detection identifiers are PostgreSQL BIGINT, assigned by the allocator.
pub type DbId = i64;

/// Camera timestamps carry no zone and are stored as written.
pub type Timestamp = chrono::NaiveDateTime;
