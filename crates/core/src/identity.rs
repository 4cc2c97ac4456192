//! Detection identifier allocation.
//!
//! The allocator is a plain value threaded through a run: seed it from
//! the persisted maximum, hand out ids in input order, and read back the
//! next id when the run is done. Identifiers record ingestion sequence,
//! not time order.
//!
//! Two concurrent runs seeded from the same maximum will hand out the
//! same ids; the ingest assumes a single writer.

use crate::types::DbId;

/// First identifier handed out against an empty store.
pub const FIRST_DETECTION_ID: DbId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    next_id: DbId,
}

impl IdAllocator {
    /// Allocator for a full rebuild, or for an empty store.
    pub fn fresh() -> Self {
        Self {
            next_id: FIRST_DETECTION_ID,
        }
    }

    /// Allocator that continues after the highest persisted id.
    pub fn continuing_after(max_persisted: Option<DbId>) -> Self {
        match max_persisted {
            Some(max) => Self { next_id: max + 1 },
            None => Self::fresh(),
        }
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub fn peek(&self) -> DbId {
        self.next_id
    }

    pub fn allocate(&mut self) -> DbId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
