use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Per-record normalization failure. Recovered locally by the orchestrator (skip + count).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("record has no external identifier")]
    MissingExternalId,

    #[error("record external identifier is blank")]
    EmptyExternalId,
}

/// Common error type for `contactsync_core`.
///
/// Backend implementations (SQLite, HTTP adapters) should preserve the underlying error chain
/// via `Error::storage` / `Error::source_unavailable`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("source unavailable: {context}")]
    SourceUnavailable {
        context: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("source protocol error: {0}")]
    SourceProtocol(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// Coarse classification used in run results and HTTP bodies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Unauthorized,
    SourceUnavailable,
    SourceProtocol,
    Validation,
    Storage,
}

impl Error {
    pub fn source_unavailable(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::SourceUnavailable {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn source_unavailable_msg(context: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            context: context.into(),
            source: None,
        }
    }

    pub fn storage(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage_msg(context: impl Into<String>) -> Self {
        Self::Storage {
            context: context.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Error::SourceProtocol(_) => ErrorKind::SourceProtocol,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Source outages and storage failures may succeed on a later run; everything else needs
    /// a fix on one side of the integration first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable { .. } | Error::Storage { .. }
        )
    }

    /// Full message including the `#[source]` chain, for logs and `details` fields.
    pub fn detail_chain(&self) -> String {
        let mut out = self.to_string();
        let mut cur = StdError::source(self);
        while let Some(e) = cur {
            out.push_str(": ");
            out.push_str(&e.to_string());
            cur = e.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::source_unavailable_msg("timeout").is_retryable());
        assert!(Error::storage_msg("locked").is_retryable());
        assert!(!Error::SourceProtocol("bad json".into()).is_retryable());
        assert!(!Error::from(ValidationError::MissingExternalId).is_retryable());
    }

    #[test]
    fn detail_chain_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::source_unavailable("connect hubspot", io);
        assert_eq!(
            err.detail_chain(),
            "source unavailable: connect hubspot: refused"
        );
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }
}
