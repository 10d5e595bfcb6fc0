use axum::middleware;
use axum::Router;

pub mod contacts;
pub mod health;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().merge(api_v1_router())
}

#[tracing::instrument(level = "debug", skip_all)]
fn api_v1_router() -> Router {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .merge(contacts::router())
            .layer(middleware::from_fn(crate::middleware::require_auth)),
    )
}
