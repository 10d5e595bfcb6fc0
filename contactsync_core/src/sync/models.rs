use crate::error::{Error, ErrorKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contact as returned by an external source, typed at the adapter boundary.
///
/// Every field is optional: the source is the authority on shape, and the normalizer is the
/// single place where a record is accepted or rejected. Decoding never fails on a field's JSON
/// type; a non-string value (including a numeric `external_id`) decodes as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalContactRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    /// Source-specific metadata (timestamps, archive flags, ...). Never persisted.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Decode an optional text field from any JSON value. Only strings survive.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

impl ExternalContactRecord {
    /// Decode one raw source element. Anything that is not a JSON object yields a record
    /// without an identifier, which the normalizer then rejects on its own.
    pub fn from_json_lenient(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) => {
                Self::deserialize(value).unwrap_or_else(|_| Self::without_id())
            }
            other => Self::without_id().with_metadata(serde_json::json!({ "raw": other })),
        }
    }

    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            ..Default::default()
        }
    }

    /// A record whose source payload carried no identifier.
    pub fn without_id() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The persisted contact row. `external_id` is the sole merge key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalContact {
    pub external_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

impl CanonicalContact {
    /// Profile fields only; two rows with equal profiles differ at most in `last_synced_at`.
    pub fn same_profile(&self, other: &CanonicalContact) -> bool {
        self.external_id == other.external_id
            && self.name == other.name
            && self.email == other.email
            && self.phone == other.phone
            && self.company == other.company
            && self.role == other.role
    }
}

/// Who or what started a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncTrigger {
    OnDemand,
    Http { actor: String },
    Cli,
}

/// Linear run state machine. A finished run records the phase it ended in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Fetching,
    Normalizing,
    Upserting,
    Done,
}

/// A record dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position of the record in the fetched sequence.
    pub index: usize,
    pub external_id: Option<String>,
    pub error: ValidationError,
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&Error> for RunFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.detail_chain(),
            retryable: err.is_retryable(),
        }
    }
}

/// Structured outcome of one sync run. Always produced, including on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRunResult {
    pub run_id: Uuid,
    pub trigger: SyncTrigger,
    pub succeeded: bool,
    /// `Done` on success, otherwise the phase that failed.
    pub phase: SyncPhase,
    pub fetched_count: u64,
    pub written_count: u64,
    pub skipped_count: u64,
    pub skipped: Vec<SkippedRecord>,
    /// Run start time; also the `last_synced_at` of every row written by this run.
    pub timestamp: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub failure: Option<RunFailure>,
}

impl SyncRunResult {
    pub fn started(run_id: Uuid, trigger: SyncTrigger, timestamp: DateTime<Utc>) -> Self {
        Self {
            run_id,
            trigger,
            succeeded: false,
            phase: SyncPhase::Fetching,
            fetched_count: 0,
            written_count: 0,
            skipped_count: 0,
            skipped: Vec::new(),
            timestamp,
            finished_at: timestamp,
            failure: None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }
}

/// Paging for the sync run log (newest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunQuery {
    pub limit: usize,
    pub offset: usize,
}

impl Default for SyncRunQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}
