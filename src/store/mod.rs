//! Remote store capabilities.
//!
//! [`SettingsStore`] is the async trait the fetch pipeline runs against.
//! [`SsmParameterStore`] implements it over AWS SSM Parameter Store;
//! [`SecretsManagerStore`] over AWS Secrets Manager.

mod secrets_manager;
mod ssm;

pub use secrets_manager::SecretsManagerStore;
pub use ssm::SsmParameterStore;

use crate::error::Result;

/// One entry returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Full path name, e.g. `/app/prod/db/host`.
    pub name: String,
    /// Opaque reference used to fetch the value (the ARN for secrets; equals
    /// `name` for parameters).
    pub identifier: String,
    /// The value, when the store returns it during listing.
    pub inline_value: Option<String>,
}

/// One page of a listing, plus the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<RemoteItem>,
    /// Opaque continuation token; `None` means this was the last page.
    pub next_token: Option<String>,
}

/// A remote, path-prefixed hierarchical key/value store.
///
/// Implementations wrap one concrete backend client. Absence of a backend is
/// expressed by the caller simply not constructing one; the loader never
/// probes for optional libraries.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Lists one page of items under `prefix`, resuming from `continuation`
    /// when given. Each fresh scan starts with `None`.
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage>;

    /// Fetches the value behind `identifier`, for stores whose listing does
    /// not return values inline.
    async fn get_value(&self, identifier: &str) -> Result<String>;

    /// Whether stored values may encode a JSON object of sub-keys that the
    /// pipeline should flatten.
    fn composite_values(&self) -> bool {
        false
    }
}
