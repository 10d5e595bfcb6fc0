use crate::auth::{ApiKeyAuth, AuthProvider};
use crate::extract::{AuthConfig, AuthConfigExt, AuthProviderExt};
use crate::routes;
use axum::routing::get;
use axum::{Extension, Router};
use contactsync_core::{ContactReader, ContactSyncEngine, SyncRunLog};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<ContactSyncEngine>,
    pub reader: ContactReader,
    pub run_log: Arc<dyn SyncRunLog>,
    /// Bearer-token validator; `None` leaves `/api/v1` closed unless auth is disabled.
    pub auth: Option<Arc<dyn AuthProvider>>,
    pub started_at: Instant,
}

impl AppState {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(
        sync: Arc<ContactSyncEngine>,
        reader: ContactReader,
        run_log: Arc<dyn SyncRunLog>,
    ) -> Self {
        Self {
            sync,
            reader,
            run_log,
            auth: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.auth = Some(Arc::new(ApiKeyAuth::new(api_key)));
        self
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router(state: AppState) -> Router {
    router_with_auth_config(state, AuthConfig::default())
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router_with_auth_config(state: AppState, auth_cfg: AuthConfig) -> Router {
    let auth_provider = state.auth.clone().map(AuthProviderExt);
    let state = Arc::new(state);

    let mut app = Router::new()
        .merge(routes::router())
        .route("/health", get(routes::health::get_health))
        .layer(Extension(state))
        .layer(Extension(AuthConfigExt(auth_cfg)));
    if let Some(provider) = auth_provider {
        app = app.layer(Extension(provider));
    }

    app.layer(SetRequestIdLayer::new(
        axum::http::HeaderName::from_static("x-request-id"),
        MakeRequestUuid,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn serve(addr: SocketAddr, state: AppState, auth_cfg: AuthConfig) -> anyhow::Result<()> {
    if auth_cfg.allow_insecure {
        tracing::warn!("authentication disabled (CONTACTSYNC_ALLOW_INSECURE)");
    } else if state.auth.is_none() {
        tracing::warn!("no api key configured; /api/v1 will reject every request");
    }

    let app = router_with_auth_config(state, auth_cfg);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "contactsync listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use contactsync_core::store::memory::MemoryContactStore;
    use contactsync_core::{
        ContactSource, Error, ExternalContactRecord, RetryPolicy, Result, SyncConfig,
    };
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Returns the configured outcome on every fetch.
    struct FixedSource {
        outcome: Mutex<std::result::Result<Vec<ExternalContactRecord>, &'static str>>,
    }

    impl FixedSource {
        fn records(records: Vec<ExternalContactRecord>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Ok(records)),
            })
        }

        fn set(&self, outcome: std::result::Result<Vec<ExternalContactRecord>, &'static str>) {
            *self.outcome.lock().unwrap() = outcome;
        }
    }

    #[async_trait]
    impl ContactSource for FixedSource {
        fn id(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_all(&self) -> Result<Vec<ExternalContactRecord>> {
            match &*self.outcome.lock().unwrap() {
                Ok(r) => Ok(r.clone()),
                Err(msg) => Err(Error::source_unavailable_msg(*msg)),
            }
        }
    }

    const KEY: &str = "test-key";

    fn app(source: Arc<FixedSource>, store: Arc<MemoryContactStore>) -> Router {
        let engine = ContactSyncEngine::new(source, store.clone())
            .with_run_log(store.clone())
            .with_config(SyncConfig {
                fetch_timeout: Duration::from_secs(5),
                retry: RetryPolicy::none(),
                ..SyncConfig::default()
            });
        let state = AppState::new(
            Arc::new(engine),
            ContactReader::new(store.clone()),
            store,
        )
        .with_api_key(KEY);
        router(state)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn sync_then_list_returns_merged_contacts() {
        let store = Arc::new(MemoryContactStore::new());
        let source = FixedSource::records(vec![
            ExternalContactRecord::new("A1").with_name("Jane"),
            ExternalContactRecord::without_id().with_name("Ghost"),
            ExternalContactRecord::new("B2").with_name("Bo"),
        ]);
        let app = app(source, store);

        let (status, body) = send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["inserted"], 2);
        assert_eq!(body["skipped"], 1);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

        let (status, body) = send(&app, request(Method::GET, "/api/v1/contacts")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["external_id"], "A1");
        assert_eq!(data[1]["external_id"], "B2");
    }

    #[tokio::test]
    async fn empty_source_reports_message() {
        let store = Arc::new(MemoryContactStore::new());
        let app = app(FixedSource::records(vec![]), store.clone());
        let (status, body) = send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inserted"], 0);
        assert_eq!(body["message"], "source returned no contacts");
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn source_outage_returns_structured_server_error() {
        let store = Arc::new(MemoryContactStore::new());
        let source = FixedSource::records(vec![ExternalContactRecord::new("A1").with_name("Jane")]);
        let app = app(source.clone(), store);
        send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;

        source.set(Err("connection refused"));
        let (status, body) = send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;
        assert!(status.is_server_error());
        assert_eq!(body["success"], false);
        assert_eq!(body["retryable"], true);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));

        let (_, body) = send(&app, request(Method::GET, "/api/v1/contacts")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Jane");
    }

    #[tokio::test]
    async fn storage_failure_on_read_is_reported() {
        let store = Arc::new(MemoryContactStore::new());
        store.set_fail_reads(true);
        let app = app(FixedSource::records(vec![]), store);
        let (status, body) = send(&app, request(Method::GET, "/api/v1/contacts")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn requests_without_key_are_rejected() {
        let store = Arc::new(MemoryContactStore::new());
        let app = app(FixedSource::records(vec![]), store.clone());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/contacts/sync")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app(
            FixedSource::records(vec![]),
            Arc::new(MemoryContactStore::new()),
        );
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn runs_and_single_contact_endpoints() {
        let store = Arc::new(MemoryContactStore::new());
        let app = app(
            FixedSource::records(vec![ExternalContactRecord::new("A1").with_name("Jane")]),
            store,
        );
        send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;

        let (status, body) = send(&app, request(Method::GET, "/api/v1/contacts/sync/runs")).await;
        assert_eq!(status, StatusCode::OK);
        let runs = body["data"].as_array().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["succeeded"], true);
        assert_eq!(runs[0]["trigger"]["actor"], "api_key");

        let (status, body) = send(&app, request(Method::GET, "/api/v1/contacts/A1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Jane");

        let (status, _) = send(&app, request(Method::GET, "/api/v1/contacts/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contact_with_id_sync_is_readable() {
        let store = Arc::new(MemoryContactStore::new());
        let app = app(
            FixedSource::records(vec![ExternalContactRecord::new("sync").with_name("Sync Person")]),
            store,
        );
        let (status, _) = send(&app, request(Method::GET, "/api/v1/contacts/sync")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;
        let (status, body) = send(&app, request(Method::GET, "/api/v1/contacts/sync")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["external_id"], "sync");
        assert_eq!(body["data"]["name"], "Sync Person");
    }

    #[tokio::test]
    async fn runs_listing_uses_configured_default_limit() {
        let store = Arc::new(MemoryContactStore::new());
        let engine = ContactSyncEngine::new(FixedSource::records(vec![]), store.clone())
            .with_run_log(store.clone())
            .with_config(SyncConfig {
                retry: RetryPolicy::none(),
                runs_default_limit: 1,
                ..SyncConfig::default()
            });
        let state = AppState::new(Arc::new(engine), ContactReader::new(store.clone()), store)
            .with_api_key(KEY);
        let app = router(state);
        send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;
        send(&app, request(Method::POST, "/api/v1/contacts/sync")).await;

        let (_, body) = send(&app, request(Method::GET, "/api/v1/contacts/sync/runs")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        let (_, body) = send(&app, request(Method::GET, "/api/v1/contacts/sync/runs?limit=5")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        let (status, _) =
            send(&app, request(Method::GET, "/api/v1/contacts/sync/runs?limit=501")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
