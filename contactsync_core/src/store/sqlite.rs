//! SQLite-backed contact store.
//!
//! Persists contacts and the sync run log in a single WAL-mode SQLite file.
//!
//! Usage:
//! ```ignore
//! let store = SqliteContactStore::new("/path/to/contacts.db").await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::store::traits::{ContactStore, SyncRunLog};
use crate::sync::models::{CanonicalContact, SyncRunQuery, SyncRunResult};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// A durable, file-backed contact store.
#[derive(Clone)]
pub struct SqliteContactStore {
    pool: SqlitePool,
}

impl SqliteContactStore {
    /// Create (or open) a store at the given file path.
    ///
    /// Creates the file and parent directories if they don't exist and applies the schema.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::storage("sqlite_contact_store: create dir", e))?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path.display()))
            .map_err(|e| Error::storage("sqlite_contact_store: options", e))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| Error::storage("sqlite_contact_store: connect", e))?;

        Self::with_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| Error::storage("sqlite_contact_store: migration", e))?;
        Ok(Self { pool })
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    external_id TEXT PRIMARY KEY CHECK (length(external_id) > 0),
    name TEXT,
    email TEXT,
    phone TEXT,
    company TEXT,
    role TEXT,
    last_synced_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contacts_last_synced_idx
    ON contacts(last_synced_at DESC, external_id);

CREATE TABLE IF NOT EXISTS contact_sync_runs (
    run_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    succeeded INTEGER NOT NULL,
    result_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contact_sync_runs_started_idx
    ON contact_sync_runs(started_at DESC);
"#;

// ── Helpers ─────────────────────────────────────────────────────

fn db_err(e: sqlx::Error) -> Error {
    Error::storage("sqlite_contact_store", e)
}

/// Fixed-width RFC 3339 (microseconds, `Z`), so text order equals time order.
fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .map_err(|e| Error::storage(format!("sqlite_contact_store: bad timestamp '{s}'"), e))
}

fn row_to_contact(r: &sqlx::sqlite::SqliteRow) -> Result<CanonicalContact> {
    let last_synced_at: String = r.try_get("last_synced_at").map_err(db_err)?;
    Ok(CanonicalContact {
        external_id: r.try_get("external_id").map_err(db_err)?,
        name: r.try_get("name").map_err(db_err)?,
        email: r.try_get("email").map_err(db_err)?,
        phone: r.try_get("phone").map_err(db_err)?,
        company: r.try_get("company").map_err(db_err)?,
        role: r.try_get("role").map_err(db_err)?,
        last_synced_at: parse_ts(&last_synced_at)?,
    })
}

const UPSERT_CONTACT: &str = "INSERT INTO contacts
    (external_id, name, email, phone, company, role, last_synced_at)
 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
 ON CONFLICT(external_id) DO UPDATE SET
   name = excluded.name,
   email = excluded.email,
   phone = excluded.phone,
   company = excluded.company,
   role = excluded.role,
   last_synced_at = excluded.last_synced_at";

// ── ContactStore impl ──────────────────────────────────────────

#[async_trait]
impl ContactStore for SqliteContactStore {
    #[tracing::instrument(level = "debug", skip_all, fields(rows = rows.len()))]
    async fn upsert_contacts(&self, rows: &[CanonicalContact]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut written = 0u64;
        for c in rows {
            let res = sqlx::query(UPSERT_CONTACT)
                .bind(&c.external_id)
                .bind(&c.name)
                .bind(&c.email)
                .bind(&c.phone)
                .bind(&c.company)
                .bind(&c.role)
                .bind(fmt_ts(c.last_synced_at))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            written += res.rows_affected();
        }
        // Dropping `tx` on an early return above rolls the batch back.
        tx.commit().await.map_err(db_err)?;
        Ok(written)
    }

    async fn list_contacts(&self) -> Result<Vec<CanonicalContact>> {
        let rows = sqlx::query(
            "SELECT external_id, name, email, phone, company, role, last_synced_at
             FROM contacts
             ORDER BY last_synced_at DESC, external_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_contact).collect()
    }

    async fn get_contact(&self, external_id: &str) -> Result<Option<CanonicalContact>> {
        let row = sqlx::query(
            "SELECT external_id, name, email, phone, company, role, last_synced_at
             FROM contacts WHERE external_id = ?1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(row_to_contact).transpose()
    }

    async fn latest_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        let max: Option<String> = sqlx::query_scalar("SELECT MAX(last_synced_at) FROM contacts")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        max.as_deref().map(parse_ts).transpose()
    }
}

// ── SyncRunLog impl ────────────────────────────────────────────

#[async_trait]
impl SyncRunLog for SqliteContactStore {
    async fn append_run(&self, run: &SyncRunResult) -> Result<()> {
        let result_json = serde_json::to_string(run)
            .map_err(|e| Error::storage("serialize sync run", e))?;
        sqlx::query(
            "INSERT INTO contact_sync_runs (run_id, started_at, succeeded, result_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(run_id) DO UPDATE SET
               succeeded = excluded.succeeded,
               result_json = excluded.result_json",
        )
        .bind(run.run_id.to_string())
        .bind(fmt_ts(run.timestamp))
        .bind(run.succeeded)
        .bind(&result_json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_runs(&self, query: SyncRunQuery) -> Result<Vec<SyncRunResult>> {
        let rows = sqlx::query(
            "SELECT result_json FROM contact_sync_runs
             ORDER BY started_at DESC
             LIMIT ?1 OFFSET ?2",
        )
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|r| {
                let s: String = r.try_get("result_json").map_err(db_err)?;
                serde_json::from_str(&s).map_err(|e| Error::storage("decode sync run", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn contact(id: &str, name: &str, at: DateTime<Utc>) -> CanonicalContact {
        CanonicalContact {
            external_id: id.to_string(),
            name: Some(name.to_string()),
            email: None,
            phone: None,
            company: None,
            role: None,
            last_synced_at: at,
        }
    }

    async fn open() -> (tempfile::TempDir, SqliteContactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteContactStore::new(dir.path().join("contacts.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap() + Duration::microseconds(123_456)
    }

    #[tokio::test]
    async fn upsert_replaces_by_external_id() {
        let (_dir, store) = open().await;
        store
            .upsert_contacts(&[contact("A1", "Jane", t0())])
            .await
            .unwrap();
        let t1 = t0() + Duration::seconds(5);
        store
            .upsert_contacts(&[contact("A1", "Jane Doe", t1)])
            .await
            .unwrap();

        let all = store.list_contacts().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(all[0].last_synced_at, t1);
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_id_tiebreak() {
        let (_dir, store) = open().await;
        let later = t0() + Duration::minutes(1);
        store
            .upsert_contacts(&[
                contact("b", "B", t0()),
                contact("a", "A", t0()),
                contact("c", "C", later),
            ])
            .await
            .unwrap();
        let ids: Vec<String> = store
            .list_contacts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.external_id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn failing_batch_is_rolled_back() {
        let (_dir, store) = open().await;
        let bad = contact("", "broken", t0());
        let err = store
            .upsert_contacts(&[contact("A1", "Jane", t0()), bad])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(store.list_contacts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_synced_at_tracks_newest_row() {
        let (_dir, store) = open().await;
        assert_eq!(store.latest_synced_at().await.unwrap(), None);
        store
            .upsert_contacts(&[
                contact("A1", "Jane", t0()),
                contact("B2", "Bo", t0() + chrono::Duration::seconds(7)),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.latest_synced_at().await.unwrap(),
            Some(t0() + chrono::Duration::seconds(7))
        );
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let (_dir, store) = open().await;
        assert!(store.list_contacts().await.unwrap().is_empty());
        assert!(store.get_contact("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_log_round_trips_newest_first() {
        use crate::sync::models::SyncTrigger;
        let (_dir, store) = open().await;
        let first = SyncRunResult::started(uuid::Uuid::new_v4(), SyncTrigger::Cli, t0());
        let second = SyncRunResult::started(
            uuid::Uuid::new_v4(),
            SyncTrigger::OnDemand,
            t0() + Duration::seconds(1),
        );
        store.append_run(&first).await.unwrap();
        store.append_run(&second).await.unwrap();

        let runs = store.list_runs(SyncRunQuery::default()).await.unwrap();
        assert_eq!(runs, vec![second.clone(), first]);

        let page = store
            .list_runs(SyncRunQuery {
                limit: 1,
                offset: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_ne!(page[0].run_id, second.run_id);
    }
}
