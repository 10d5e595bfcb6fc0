//! Process-wide tracing setup.

use crate::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Install the global subscriber using `RUST_LOG` (default `info`) and
/// `CONTACTSYNC_LOG_FORMAT` (`json` | `pretty`, default `json`).
#[tracing::instrument(level = "debug")]
pub fn init_tracing_from_env() -> Result<()> {
    let format = match std::env::var("CONTACTSYNC_LOG_FORMAT") {
        Ok(v) if !v.trim().is_empty() => LogFormat::parse(&v).ok_or_else(|| {
            Error::InvalidInput(format!("invalid CONTACTSYNC_LOG_FORMAT: {v}"))
        })?,
        _ => LogFormat::default(),
    };
    init_tracing(format)
}

pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let res = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    res.map_err(|e| Error::InvalidInput(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
