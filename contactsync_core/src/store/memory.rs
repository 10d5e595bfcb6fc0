//! In-process store backend for tests and ephemeral dev runs.

use crate::store::traits::{ContactStore, SyncRunLog};
use crate::sync::models::{CanonicalContact, SyncRunQuery, SyncRunResult};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryContactStore {
    contacts: RwLock<BTreeMap<String, CanonicalContact>>,
    runs: RwLock<Vec<SyncRunResult>>,
    write_calls: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upsert_contacts` calls that reached this store.
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    #[tracing::instrument(level = "debug", skip_all, fields(rows = rows.len()))]
    async fn upsert_contacts(&self, rows: &[CanonicalContact]) -> Result<u64> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage_msg("memory store: writes disabled"));
        }
        if rows.iter().any(|r| r.external_id.is_empty()) {
            return Err(Error::storage_msg("memory store: empty external_id"));
        }

        // Single write lock held for the whole batch.
        let mut contacts = self.contacts.write().await;
        for row in rows {
            contacts.insert(row.external_id.clone(), row.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn list_contacts(&self) -> Result<Vec<CanonicalContact>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage_msg("memory store: reads disabled"));
        }
        let contacts = self.contacts.read().await;
        let mut out: Vec<CanonicalContact> = contacts.values().cloned().collect();
        out.sort_by(|a, b| {
            b.last_synced_at
                .cmp(&a.last_synced_at)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        Ok(out)
    }

    async fn get_contact(&self, external_id: &str) -> Result<Option<CanonicalContact>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage_msg("memory store: reads disabled"));
        }
        Ok(self.contacts.read().await.get(external_id).cloned())
    }

    async fn latest_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage_msg("memory store: reads disabled"));
        }
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .map(|c| c.last_synced_at)
            .max())
    }
}

#[async_trait]
impl SyncRunLog for MemoryContactStore {
    async fn append_run(&self, run: &SyncRunResult) -> Result<()> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn list_runs(&self, query: SyncRunQuery) -> Result<Vec<SyncRunResult>> {
        let runs = self.runs.read().await;
        let mut out: Vec<SyncRunResult> = runs.clone();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}
