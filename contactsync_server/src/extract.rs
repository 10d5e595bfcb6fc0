use crate::auth::{AuthProvider, Caller};
use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::future;
use std::sync::Arc;

/// Request auth policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthConfig {
    /// Skip credential checks entirely (local development only).
    pub allow_insecure: bool,
}

impl AuthConfig {
    /// `CONTACTSYNC_ALLOW_INSECURE=true|1|yes` disables auth.
    pub fn from_env() -> Self {
        let allow_insecure = std::env::var("CONTACTSYNC_ALLOW_INSECURE")
            .ok()
            .map(|v| {
                matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(false);
        Self { allow_insecure }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthConfigExt(pub AuthConfig);

#[derive(Clone)]
pub struct AuthProviderExt(pub Arc<dyn AuthProvider>);

/// The caller recorded by the auth middleware; `anonymous` when auth is disabled.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[tracing::instrument(level = "debug", name = "extract.caller", skip_all)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let caller = parts
            .extensions
            .get::<Caller>()
            .cloned()
            .unwrap_or_else(|| Caller {
                name: "anonymous".to_string(),
            });
        future::ready(Ok(Self(caller)))
    }
}
