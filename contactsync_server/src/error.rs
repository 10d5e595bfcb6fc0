use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contactsync_core::error as core_error;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Core(#[from] contactsync_core::Error),
}

impl ApiError {
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => status_for_kind(err.kind()),
        }
    }
}

pub(crate) fn status_for_kind(kind: core_error::ErrorKind) -> StatusCode {
    use core_error::ErrorKind;
    match kind {
        ErrorKind::InvalidInput | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::SourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SourceProtocol => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let details = match &self {
            ApiError::Core(err) => {
                let chain = err.detail_chain();
                (chain != err.to_string()).then_some(chain)
            }
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            details,
        };
        (code, Json(body)).into_response()
    }
}
