//! The top-level loader tying config, store, and fetch strategy together.

use std::fmt;
use std::sync::Arc;

use aws_config::Region;
use tracing::info;

use crate::config::{LoaderConfig, StoreKind};
use crate::error::Result;
use crate::report::LoadReport;
use crate::store::{SecretsManagerStore, SettingsStore, SsmParameterStore};
use crate::strategy;
use crate::view::SettingsView;

/// A finished load: the settings snapshot plus how it was produced.
///
/// Loading happens once, at construction. There is no refresh; build a new
/// loader to pick up remote changes.
#[derive(Debug)]
pub struct Loader {
    config: LoaderConfig,
    view: SettingsView,
    report: LoadReport,
}

impl Loader {
    /// Connects to the configured AWS store and loads everything under the
    /// path prefix.
    pub async fn connect(config: LoaderConfig) -> Result<Self> {
        config.validate()?;

        let sdk_config = aws_config::from_env()
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let store: Arc<dyn SettingsStore> = match config.store {
            StoreKind::ParameterStore => Arc::new(SsmParameterStore::new(&sdk_config)),
            StoreKind::SecretsManager => {
                Arc::new(SecretsManagerStore::new(&sdk_config, config.page_size))
            }
        };
        Self::load_with(config, store).await
    }

    /// Loads through a caller-supplied store.
    ///
    /// This is the seam tests and embedders use to swap the backend;
    /// [`connect`](Self::connect) goes through it with the real AWS clients.
    pub async fn load_with(config: LoaderConfig, store: Arc<dyn SettingsStore>) -> Result<Self> {
        config.validate()?;
        info!(store = %config.store, path = %config.path, "loading settings");

        let (settings, report) = strategy::load(store, &config).await?;
        report.log();

        Ok(Self {
            view: SettingsView::new(settings, report.started_at),
            config,
            report,
        })
    }

    /// Looks up one setting by section and key.
    pub fn get_setting(&self, section: &str, key: &str) -> Result<&str> {
        self.view.get_setting(section, key)
    }

    /// The read-only settings snapshot.
    pub fn view(&self) -> &SettingsView {
        &self.view
    }

    /// Counters for the load that built this snapshot.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} settings from {} region {}",
            self.config.store, self.config.path, self.config.region
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn config() -> LoaderConfig {
        LoaderConfig::new(StoreKind::ParameterStore, "/app/prod/", "us-east-1")
    }

    #[tokio::test]
    async fn test_load_with_builds_a_queryable_view() {
        let store = MemoryStore::new().with_page(vec![
            MemoryStore::item("/app/prod/db/host", Some("h1")),
            MemoryStore::item("/app/prod/db/port", Some("5432")),
        ]);

        let loader = Loader::load_with(config(), Arc::new(store)).await.unwrap();

        assert_eq!(loader.get_setting("db", "host").unwrap(), "h1");
        assert_eq!(loader.get_setting("db", "port").unwrap(), "5432");
        assert_eq!(loader.view().len(), 2);
        assert_eq!(loader.report().items_listed, 2);
    }

    #[tokio::test]
    async fn test_load_with_rejects_invalid_config_before_any_call() {
        let store = MemoryStore::new().with_page(vec![MemoryStore::item("/a/b", Some("v"))]);
        let store = Arc::new(store);
        let bad = config().with_page_size(0);

        let store_for_load: Arc<dyn SettingsStore> = store.clone();
        let err = Loader::load_with(bad, store_for_load).await.unwrap_err();

        assert!(matches!(err, crate::error::SettingsError::InvalidConfig(_)));
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_display_names_store_path_and_region() {
        let store = MemoryStore::new();
        let loader = Loader::load_with(config(), Arc::new(store)).await.unwrap();

        assert_eq!(
            loader.to_string(),
            "parameter-store settings from /app/prod/ region us-east-1"
        );
    }
}
