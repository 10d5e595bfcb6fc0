use crate::sync::models::{CanonicalContact, SyncRunQuery, SyncRunResult};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable keyed contact store.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Insert-or-replace every row keyed by `external_id`, atomically: either the whole batch
    /// is committed or nothing is. Returns the number of rows written.
    async fn upsert_contacts(&self, rows: &[CanonicalContact]) -> Result<u64>;

    /// All rows ordered by `last_synced_at` descending, ties by `external_id` ascending.
    async fn list_contacts(&self) -> Result<Vec<CanonicalContact>>;

    async fn get_contact(&self, external_id: &str) -> Result<Option<CanonicalContact>>;

    /// Newest `last_synced_at` across all rows; `None` for an empty store.
    async fn latest_synced_at(&self) -> Result<Option<DateTime<Utc>>>;
}

/// Append-only log of sync run results, for operator inspection.
#[async_trait]
pub trait SyncRunLog: Send + Sync {
    async fn append_run(&self, run: &SyncRunResult) -> Result<()>;

    /// Newest first by run start time.
    async fn list_runs(&self, query: SyncRunQuery) -> Result<Vec<SyncRunResult>>;
}
