use crate::store::traits::ContactStore;
use crate::sync::models::CanonicalContact;
use crate::{Error, Result};
use std::sync::Arc;

/// Read-only view over the merged contact set.
#[derive(Clone)]
pub struct ContactReader {
    store: Arc<dyn ContactStore>,
}

impl ContactReader {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Every contact, most recently synced first (ties by `external_id`).
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<CanonicalContact>> {
        self.store.list_contacts().await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, external_id: &str) -> Result<CanonicalContact> {
        if external_id.trim().is_empty() {
            return Err(Error::InvalidInput("external_id is empty".to_string()));
        }
        self.store
            .get_contact(external_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("contact '{external_id}' not found")))
    }
}
