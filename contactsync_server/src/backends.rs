//! Wiring of concrete store and source backends from CLI arguments and the environment.

use crate::cli::{SourceArgs, SourceKind, StoreArgs};
use crate::server::AppState;
use contactsync_core::store::sqlite::SqliteContactStore;
use contactsync_core::{
    ContactReader, ContactSource, ContactStore, ContactSyncEngine, SyncConfig, SystemClock,
};
use contactsync_integrations::connectors::hubspot::HubSpotConnector;
use contactsync_integrations::connectors::json_file::JsonFileConnector;
use std::sync::Arc;

#[tracing::instrument(level = "debug")]
pub fn build_source(args: &SourceArgs) -> anyhow::Result<Arc<dyn ContactSource>> {
    match args.source {
        SourceKind::Hubspot => Ok(Arc::new(HubSpotConnector::from_env()?)),
        SourceKind::File => {
            let path = args
                .contacts_file
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--source file requires --contacts-file"))?;
            Ok(Arc::new(JsonFileConnector::new(path)))
        }
    }
}

#[tracing::instrument(level = "debug")]
pub async fn open_store(args: &StoreArgs) -> anyhow::Result<Arc<SqliteContactStore>> {
    Ok(Arc::new(SqliteContactStore::new(&args.db_path).await?))
}

/// Build a sync engine over the given store, with config from the environment.
///
/// The clock is seeded past the newest stored `last_synced_at`, so runs from separate
/// processes keep advancing it even if the wall clock steps backwards.
pub async fn build_engine(
    source: Arc<dyn ContactSource>,
    store: Arc<SqliteContactStore>,
) -> anyhow::Result<ContactSyncEngine> {
    let config = SyncConfig::from_env()?;
    let floor = store.latest_synced_at().await?;
    Ok(ContactSyncEngine::new(source, store.clone())
        .with_run_log(store)
        .with_clock(Arc::new(SystemClock::after(floor)))
        .with_config(config))
}

/// Full server state; the API key comes from `CONTACTSYNC_API_KEY` when set.
#[tracing::instrument(level = "info")]
pub async fn build_state(store_args: &StoreArgs, source_args: &SourceArgs) -> anyhow::Result<AppState> {
    let store = open_store(store_args).await?;
    let source = build_source(source_args)?;
    tracing::info!(source = source.id(), db = %store_args.db_path.display(), "backends ready");

    let engine = build_engine(source, store.clone()).await?;
    let mut state = AppState::new(
        Arc::new(engine),
        ContactReader::new(store.clone()),
        store,
    );
    if let Ok(key) = std::env::var("CONTACTSYNC_API_KEY") {
        if !key.trim().is_empty() {
            state = state.with_api_key(&key);
        }
    }
    Ok(state)
}
