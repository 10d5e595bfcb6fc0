//! JSON file connector.
//!
//! Reads the full contact set from a local JSON document on every fetch. Accepts either a
//! top-level array of records or `{ "contacts": [...] }`. Used for local development and
//! fixture-driven runs. Only the document shape is strict; each element is decoded on its own
//! so one malformed record cannot hide the rest.

use async_trait::async_trait;
use contactsync_core::{ContactSource, Error, ExternalContactRecord, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContactsDocument {
    List(Vec<serde_json::Value>),
    Wrapped { contacts: Vec<serde_json::Value> },
}

#[derive(Debug, Clone)]
pub struct JsonFileConnector {
    path: PathBuf,
}

impl JsonFileConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContactSource for JsonFileConnector {
    fn id(&self) -> &'static str {
        "json_file"
    }

    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    async fn fetch_all(&self) -> Result<Vec<ExternalContactRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::source_unavailable(format!("read {}", self.path.display()), e)
        })?;
        let doc: ContactsDocument = serde_json::from_slice(&bytes).map_err(|e| {
            Error::SourceProtocol(format!("decode {}: {e}", self.path.display()))
        })?;
        let elements = match doc {
            ContactsDocument::List(elements) => elements,
            ContactsDocument::Wrapped { contacts } => contacts,
        };
        Ok(elements
            .iter()
            .map(ExternalContactRecord::from_json_lenient)
            .collect())
    }
}
