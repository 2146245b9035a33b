//! Load remote settings from AWS into a flat, read-only map.
//!
//! Everything under a path prefix in SSM Parameter Store or Secrets Manager
//! is listed page by page, each item's value resolved (inline for
//! parameters, a second fetch for secrets, with JSON-object secrets
//! flattened field by field), and the results keyed by `section/key`
//! addresses derived from the item names. The result is a [`SettingsView`]
//! frozen at load time.
//!
//! ```no_run
//! use remote_settings::{Loader, LoaderConfig, StoreKind};
//!
//! # async fn run() -> remote_settings::Result<()> {
//! let config = LoaderConfig::new(StoreKind::ParameterStore, "/app/prod/", "us-east-1");
//! let loader = Loader::connect(config).await?;
//! let host = loader.get_setting("db", "host")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod report;
pub mod store;
pub mod strategy;
pub mod view;

mod flatten;
mod pages;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_PAGE_SIZE, LoaderConfig, StoreKind};
pub use error::{Result, SettingsError};
pub use loader::Loader;
pub use report::LoadReport;
pub use store::{ListPage, RemoteItem, SecretsManagerStore, SettingsStore, SsmParameterStore};
pub use strategy::FetchStrategy;
pub use view::{SettingsMap, SettingsView};
