use crate::store::traits::ContactStore;
use crate::sync::models::CanonicalContact;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Merges normalized contacts into the store, last-write-wins by `external_id`.
#[derive(Clone)]
pub struct UpsertEngine {
    store: Arc<dyn ContactStore>,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Write the batch as one atomic store operation and return the number of rows written.
    ///
    /// An empty batch returns 0 without touching the store. Repeated identifiers within the
    /// batch collapse to their last occurrence.
    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub async fn upsert_batch(&self, records: Vec<CanonicalContact>) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let batch = collapse_duplicates(records);
        let written = self.store.upsert_contacts(&batch).await?;
        tracing::debug!(written, "contact batch committed");
        Ok(written)
    }
}

/// Keep the last record per `external_id`, preserving first-seen order.
fn collapse_duplicates(records: Vec<CanonicalContact>) -> Vec<CanonicalContact> {
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<CanonicalContact> = Vec::with_capacity(records.len());
    for rec in records {
        match slot.get(&rec.external_id) {
            Some(&i) => out[i] = rec,
            None => {
                slot.insert(rec.external_id.clone(), out.len());
                out.push(rec);
            }
        }
    }
    out
}
