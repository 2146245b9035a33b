//! Loader configuration: which store to read, where, and how hard to push it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::Semaphore;

use crate::error::{Result, SettingsError};
use crate::strategy::FetchStrategy;

/// Listing page size sent to stores that accept one (the Secrets Manager
/// listing API caps this at 100).
pub const DEFAULT_PAGE_SIZE: i32 = 100;

/// Default cap on in-flight value fetches during a concurrent load.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// The kind of remote store a [`crate::Loader`] reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// AWS SSM Parameter Store: listing returns values inline.
    ParameterStore,
    /// AWS Secrets Manager: listing returns identifiers, values are fetched
    /// separately and may encode a JSON object of sub-keys.
    SecretsManager,
}

impl StoreKind {
    /// The fetch strategy used when the config does not override it.
    ///
    /// Parameter listings already carry values, so there is nothing to fan
    /// out; secrets need one extra fetch per item, which is worth running
    /// concurrently.
    pub fn default_strategy(self) -> FetchStrategy {
        match self {
            StoreKind::ParameterStore => FetchStrategy::Sequential,
            StoreKind::SecretsManager => FetchStrategy::Concurrent,
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::ParameterStore => write!(f, "parameter-store"),
            StoreKind::SecretsManager => write!(f, "secrets-manager"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parameter-store" => Ok(StoreKind::ParameterStore),
            "secrets-manager" => Ok(StoreKind::SecretsManager),
            other => Err(SettingsError::InvalidConfig(format!(
                "unknown store kind '{other}' (expected parameter-store or secrets-manager)"
            ))),
        }
    }
}

/// Configuration for a single [`crate::Loader`].
///
/// Derives `Deserialize` so applications can embed it in their own config
/// files; this crate itself only builds it in code or from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Which backing store to read.
    pub store: StoreKind,
    /// Path prefix all settings live under, e.g. `/myapp/prod/`. Accepted
    /// with or without the trailing slash.
    pub path: String,
    /// AWS region the store's client connects to.
    pub region: String,
    /// Listing page size, 1..=100. Only shapes stores that accept an
    /// explicit page size on their listing call.
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    /// Cap on in-flight value fetches during a concurrent load.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Optional strategy override; per-store default otherwise.
    #[serde(default)]
    pub strategy: Option<FetchStrategy>,
}

fn default_page_size() -> i32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl LoaderConfig {
    /// Creates a config with default page size, concurrency, and strategy.
    pub fn new(store: StoreKind, path: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
            region: region.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            strategy: None,
        }
    }

    /// Builds a config from `SETTINGS_*` environment variables.
    ///
    /// `SETTINGS_STORE` and `SETTINGS_PATH` are required; the region comes
    /// from `SETTINGS_REGION`, falling back to `AWS_REGION`. Optional:
    /// `SETTINGS_PAGE_SIZE`, `SETTINGS_MAX_CONCURRENCY`, `SETTINGS_STRATEGY`.
    pub fn from_env() -> Result<Self> {
        let store = env_var_or_none("SETTINGS_STORE")
            .ok_or_else(|| SettingsError::InvalidConfig("SETTINGS_STORE is not set".to_string()))?
            .parse()?;
        let path = env_var_or_none("SETTINGS_PATH")
            .ok_or_else(|| SettingsError::InvalidConfig("SETTINGS_PATH is not set".to_string()))?;
        let region = env_var_or_none("SETTINGS_REGION")
            .or_else(|| env_var_or_none("AWS_REGION"))
            .ok_or_else(|| {
                SettingsError::InvalidConfig(
                    "neither SETTINGS_REGION nor AWS_REGION is set".to_string(),
                )
            })?;

        let mut config = Self::new(store, path, region);
        if let Some(raw) = env_var_or_none("SETTINGS_PAGE_SIZE") {
            config.page_size = parse_env_number("SETTINGS_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = env_var_or_none("SETTINGS_MAX_CONCURRENCY") {
            config.max_concurrency = parse_env_number("SETTINGS_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = env_var_or_none("SETTINGS_STRATEGY") {
            config.strategy = Some(raw.parse()?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the listing page size.
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the concurrent-load fetch cap.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Overrides the per-store default strategy.
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// The strategy this config resolves to: the override if set, the
    /// store's default otherwise.
    pub fn effective_strategy(&self) -> FetchStrategy {
        self.strategy.unwrap_or_else(|| self.store.default_strategy())
    }

    /// Checks the config before any network call is made.
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "path must not be empty".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "region must not be empty".to_string(),
            ));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(SettingsError::InvalidConfig(format!(
                "page_size must be between 1 and 100 (got {})",
                self.page_size
            )));
        }
        // Semaphore::new panics past MAX_PERMITS; reject here instead.
        if !(1..=Semaphore::MAX_PERMITS).contains(&self.max_concurrency) {
            return Err(SettingsError::InvalidConfig(format!(
                "max_concurrency must be between 1 and {} (got {})",
                Semaphore::MAX_PERMITS,
                self.max_concurrency
            )));
        }
        Ok(())
    }
}

/// Read an environment variable, returning None if unset, empty, or
/// whitespace-only. The value is trimmed.
fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_env_number<T: FromStr>(var: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        SettingsError::InvalidConfig(format!("{var} must be a number (got '{raw}')"))
    })
}
