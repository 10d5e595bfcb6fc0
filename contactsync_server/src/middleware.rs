use crate::error::ApiError;
use crate::extract::{AuthConfigExt, AuthProviderExt};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{body::Body, http::Request};

/// Require verified credentials on every request routed through this layer.
///
/// Applied to the `/api/v1` router; `/health` stays public. On success the `Caller` is
/// inserted into request extensions for `CallerIdentity`.
pub async fn require_auth(mut req: Request<Body>, next: Next) -> Response {
    let cfg = req
        .extensions()
        .get::<AuthConfigExt>()
        .copied()
        .map(|c| c.0)
        .unwrap_or_default();

    if cfg.allow_insecure {
        return next.run(req).await;
    }

    let Some(provider) = req.extensions().get::<AuthProviderExt>().cloned() else {
        return ApiError::Unauthorized("auth provider not configured".to_string())
            .into_response();
    };

    match provider.0.authenticate(req.headers()).await {
        Ok(Some(caller)) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthorized("missing credentials".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}
