use crate::error::{status_for_kind, ApiError};
use crate::extract::CallerIdentity;
use crate::server::AppState;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json};
use chrono::{DateTime, SecondsFormat};
use contactsync_core::{
    CanonicalContact, SyncRunLog, SyncRunQuery, SyncRunResult, SyncTrigger, MAX_RUNS_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct SyncSuccessResponse {
    pub success: bool,
    pub inserted: u64,
    pub skipped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// RFC 3339 run start time.
    pub timestamp: String,
    pub run_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SyncFailureResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub retryable: bool,
    pub run_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/contacts", get(list_contacts))
        .route("/contacts/sync", post(trigger_sync).get(get_contact_named_sync))
        .route("/contacts/sync/runs", get(list_runs))
        .route("/contacts/{external_id}", get(get_contact))
}

fn rfc3339(t: DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Map a finished run onto the trigger endpoint's response contract.
pub(crate) fn sync_response(run: &SyncRunResult) -> Response {
    if run.succeeded {
        let message = if run.fetched_count == 0 {
            Some("source returned no contacts".to_string())
        } else if run.skipped_count > 0 {
            Some(format!(
                "skipped {} invalid contact record(s)",
                run.skipped_count
            ))
        } else {
            None
        };
        let body = SyncSuccessResponse {
            success: true,
            inserted: run.written_count,
            skipped: run.skipped_count,
            message,
            timestamp: rfc3339(run.timestamp),
            run_id: run.run_id,
        };
        return (StatusCode::OK, Json(body)).into_response();
    }

    let (code, error, retryable) = match &run.failure {
        Some(f) => (status_for_kind(f.kind), f.message.clone(), f.retryable),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "sync failed".to_string(),
            false,
        ),
    };
    let body = SyncFailureResponse {
        success: false,
        error,
        details: Some(format!(
            "failed during {:?}; fetched={} skipped={}",
            run.phase, run.fetched_count, run.skipped_count
        )),
        retryable,
        run_id: run.run_id,
    };
    (code, Json(body)).into_response()
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn trigger_sync(
    CallerIdentity(caller): CallerIdentity,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    let run = state
        .sync
        .run(SyncTrigger::Http { actor: caller.name })
        .await;
    sync_response(&run)
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn list_contacts(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<CanonicalContact>>>, ApiError> {
    let contacts = state.reader.list_all().await?;
    Ok(DataResponse::ok(contacts))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_contact(
    Extension(state): Extension<Arc<AppState>>,
    Path(external_id): Path<String>,
) -> Result<Json<DataResponse<CanonicalContact>>, ApiError> {
    let contact = state.reader.get(&external_id).await?;
    Ok(DataResponse::ok(contact))
}

/// The static `/contacts/sync` route wins over `/contacts/{external_id}`, so a contact whose id
/// is literally `sync` is served here.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_contact_named_sync(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<DataResponse<CanonicalContact>>, ApiError> {
    let contact = state.reader.get("sync").await?;
    Ok(DataResponse::ok(contact))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn list_runs(
    Extension(state): Extension<Arc<AppState>>,
    Query(q): Query<RunsQuery>,
) -> Result<Json<DataResponse<Vec<SyncRunResult>>>, ApiError> {
    let limit = q.limit.unwrap_or(state.sync.config().runs_default_limit);
    if limit == 0 || limit > MAX_RUNS_LIMIT {
        return Err(ApiError::InvalidInput(format!(
            "limit must be between 1 and {MAX_RUNS_LIMIT}"
        )));
    }
    let runs = state
        .run_log
        .list_runs(SyncRunQuery {
            limit,
            offset: q.offset.unwrap_or(0),
        })
        .await?;
    Ok(DataResponse::ok(runs))
}
