use crate::config::SyncConfig;
use crate::store::traits::{ContactStore, SyncRunLog};
use crate::sync::clock::{Clock, SystemClock};
use crate::sync::models::{
    CanonicalContact, ExternalContactRecord, RunFailure, SkippedRecord, SyncPhase,
    SyncRunResult, SyncTrigger,
};
use crate::sync::normalize::normalize;
use crate::sync::traits::ContactSource;
use crate::sync::upsert::UpsertEngine;
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Runs fetch → normalize → upsert as one linear pass.
///
/// Runs are not serialized against each other; callers needing exclusivity must serialize
/// invocations themselves.
pub struct ContactSyncEngine {
    source: Arc<dyn ContactSource>,
    upsert: UpsertEngine,
    run_log: Option<Arc<dyn SyncRunLog>>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
}

impl ContactSyncEngine {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(source: Arc<dyn ContactSource>, store: Arc<dyn ContactStore>) -> Self {
        Self {
            source,
            upsert: UpsertEngine::new(store),
            run_log: None,
            clock: Arc::new(SystemClock::new()),
            config: SyncConfig::default(),
        }
    }

    /// Append every run result to this log (best effort).
    pub fn with_run_log(mut self, run_log: Arc<dyn SyncRunLog>) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn source_id(&self) -> &'static str {
        self.source.id()
    }

    /// Execute one full sync run. Never fails: the outcome, including errors and partial
    /// counts, is carried in the returned `SyncRunResult`.
    #[tracing::instrument(level = "info", skip(self), fields(source = self.source.id()))]
    pub async fn run(&self, trigger: SyncTrigger) -> SyncRunResult {
        let started_at = self.clock.now();
        let mut run = SyncRunResult::started(Uuid::new_v4(), trigger, started_at);
        tracing::info!(run_id = %run.run_id, %started_at, "contact sync started");

        if let Err(e) = self.execute(&mut run).await {
            run.succeeded = false;
            run.failure = Some(RunFailure::from(&e));
            tracing::error!(
                run_id = %run.run_id,
                phase = ?run.phase,
                retryable = e.is_retryable(),
                error = %e.detail_chain(),
                "contact sync failed"
            );
        } else {
            run.succeeded = true;
            run.phase = SyncPhase::Done;
            tracing::info!(
                run_id = %run.run_id,
                fetched = run.fetched_count,
                written = run.written_count,
                skipped = run.skipped_count,
                "contact sync finished"
            );
        }
        run.finished_at = self.clock.now();

        if let Some(log) = &self.run_log {
            if let Err(e) = log.append_run(&run).await {
                tracing::warn!(run_id = %run.run_id, error = %e, "failed to record sync run");
            }
        }
        run
    }

    async fn execute(&self, run: &mut SyncRunResult) -> Result<()> {
        run.phase = SyncPhase::Fetching;
        let records = self.fetch_with_retry().await?;
        run.fetched_count = records.len() as u64;
        if records.is_empty() {
            tracing::info!(run_id = %run.run_id, "source returned no contacts");
            return Ok(());
        }

        run.phase = SyncPhase::Normalizing;
        let (valid, skipped) = normalize_all(&records, run.timestamp);
        for s in &skipped {
            tracing::warn!(
                run_id = %run.run_id,
                index = s.index,
                external_id = ?s.external_id,
                reason = %s.error,
                "skipping invalid contact record"
            );
        }
        run.skipped_count = skipped.len() as u64;
        run.skipped = skipped;

        run.phase = SyncPhase::Upserting;
        run.written_count = self.upsert.upsert_batch(valid).await?;
        Ok(())
    }

    async fn fetch_with_retry(&self) -> Result<Vec<ExternalContactRecord>> {
        let attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once().await {
                Ok(records) => return Ok(records),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.config.retry.delay_before_retry(attempt);
                    tracing::warn!(attempt, ?delay, error = %e, "contact fetch failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<Vec<ExternalContactRecord>> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, self.source.fetch_all()).await {
            Ok(res) => res,
            Err(_) => Err(Error::source_unavailable_msg(format!(
                "{} fetch timed out after {}ms",
                self.source.id(),
                timeout.as_millis()
            ))),
        }
    }
}

fn normalize_all(
    records: &[ExternalContactRecord],
    synced_at: chrono::DateTime<Utc>,
) -> (Vec<CanonicalContact>, Vec<SkippedRecord>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for (index, rec) in records.iter().enumerate() {
        match normalize(rec, synced_at) {
            Ok(c) => valid.push(c),
            Err(error) => skipped.push(SkippedRecord {
                index,
                external_id: rec.external_id.clone(),
                error,
            }),
        }
    }
    (valid, skipped)
}
