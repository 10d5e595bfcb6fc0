//! Contact synchronization pipeline.
//!
//! One run is a linear pass:
//! - Fetch the full contact set from a `ContactSource`
//! - Normalize each record into a `CanonicalContact` stamped with the run start time
//! - Upsert the valid records as one atomic batch keyed by `external_id`
//! - Report a `SyncRunResult` (and append it to a `SyncRunLog` when configured)

pub mod clock;
pub mod engine;
pub mod models;
pub mod normalize;
pub mod reader;
pub mod traits;
pub mod upsert;
