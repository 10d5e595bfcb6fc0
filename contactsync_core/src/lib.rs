//! contactsync core library: pipeline, models and storage shared by the server and adapters.

pub mod config;
pub mod error;
pub mod o11y;
pub mod store;
pub mod sync;

pub use config::{RetryPolicy, SyncConfig, MAX_RUNS_LIMIT};
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use store::traits::{ContactStore, SyncRunLog};
pub use sync::clock::{Clock, SteppingClock, SystemClock};
pub use sync::engine::ContactSyncEngine;
pub use sync::models::{
    CanonicalContact, ExternalContactRecord, RunFailure, SkippedRecord, SyncPhase, SyncRunQuery,
    SyncRunResult, SyncTrigger,
};
pub use sync::normalize::normalize;
pub use sync::reader::ContactReader;
pub use sync::traits::ContactSource;
pub use sync::upsert::UpsertEngine;
