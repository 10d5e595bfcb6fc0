use crate::sync::models::ExternalContactRecord;
use crate::Result;
use async_trait::async_trait;

/// An external system holding the authoritative set of contacts.
///
/// Adapter implementations live in `contactsync_integrations` or customer code.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Stable adapter identifier, e.g. "hubspot".
    fn id(&self) -> &'static str;

    /// Fetch the full current contact set.
    ///
    /// Fails with `Error::SourceUnavailable` for network/auth/timeout failures and
    /// `Error::SourceProtocol` when the response cannot be read as contacts. Implementations
    /// must not retry and must not touch local state.
    async fn fetch_all(&self) -> Result<Vec<ExternalContactRecord>>;
}
