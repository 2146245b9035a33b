//! Resolving listed items into settings, one at a time or fanned out.
//!
//! Both strategies produce byte-identical maps for the same listing. The
//! concurrent path spawns one task per item with a semaphore capping how many
//! value fetches are in flight; results are merged by the awaiting caller in
//! listing order, so collision handling stays deterministic regardless of
//! task completion order.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::error::{Result, SettingsError};
use crate::flatten::{self, MappedItem};
use crate::pages;
use crate::report::LoadReport;
use crate::store::{RemoteItem, SettingsStore};
use crate::view::SettingsMap;

/// How listed items are resolved into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// One value fetch at a time, in listing order.
    Sequential,
    /// Value fetches fan out across tasks, capped by
    /// [`LoaderConfig::max_concurrency`](crate::LoaderConfig).
    Concurrent,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Sequential => write!(f, "sequential"),
            FetchStrategy::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(FetchStrategy::Sequential),
            "concurrent" => Ok(FetchStrategy::Concurrent),
            other => Err(SettingsError::InvalidConfig(format!(
                "unknown fetch strategy '{other}' (expected sequential or concurrent)"
            ))),
        }
    }
}

/// Runs the whole pipeline: drain the listing, resolve every item, flatten
/// into the settings map.
#[tracing::instrument(skip(store, config), fields(store = %config.store, path = %config.path))]
pub(crate) async fn load(
    store: Arc<dyn SettingsStore>,
    config: &LoaderConfig,
) -> Result<(SettingsMap, LoadReport)> {
    let started_at = Utc::now();
    let started = Instant::now();

    let listing = pages::drain(store.as_ref(), &config.path).await?;
    let items_listed = listing.items.len();
    let strategy = config.effective_strategy();
    debug!(items = items_listed, %strategy, "resolving listed items");

    let mapped = match strategy {
        FetchStrategy::Sequential => {
            resolve_sequential(store.as_ref(), &config.path, listing.items).await?
        }
        FetchStrategy::Concurrent => {
            resolve_concurrent(store, &config.path, listing.items, config.max_concurrency).await?
        }
    };

    let mut merged = Merged::default();
    for item in mapped {
        merged.absorb(item);
    }

    let report = LoadReport {
        started_at,
        elapsed_ms: started.elapsed().as_millis() as u64,
        pages: listing.pages,
        items_listed,
        entries: merged.map.len(),
        composite_items: merged.composite_items,
        collisions: merged.collisions,
    };
    Ok((merged.map, report))
}

/// Settings accumulated in listing order. Later items overwrite earlier ones
/// at the same address; each overwrite is logged and counted.
#[derive(Default)]
struct Merged {
    map: SettingsMap,
    composite_items: usize,
    collisions: usize,
}

impl Merged {
    fn absorb(&mut self, item: MappedItem) {
        if item.composite {
            self.composite_items += 1;
        }
        for entry in item.entries {
            if self.map.contains_key(&entry.key) {
                self.collisions += 1;
                warn!(key = %entry.key, "setting overwritten by a later item");
            }
            self.map.insert(entry.key, entry.value);
        }
    }
}

async fn resolve_sequential(
    store: &dyn SettingsStore,
    prefix: &str,
    items: Vec<RemoteItem>,
) -> Result<Vec<MappedItem>> {
    let composite = store.composite_values();
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        let value = resolve_value(store, &item).await?;
        mapped.push(flatten::map_item(&item.name, prefix, &value, composite)?);
    }
    Ok(mapped)
}

/// Spawns one fetch task per item and awaits them all.
///
/// Every task runs to completion even when one fails; the error reported is
/// the earliest failing item in listing order.
async fn resolve_concurrent(
    store: Arc<dyn SettingsStore>,
    prefix: &str,
    items: Vec<RemoteItem>,
    max_concurrency: usize,
) -> Result<Vec<MappedItem>> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let composite = store.composite_values();

    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        let prefix = prefix.to_string();
        handles.push(tokio::spawn(async move {
            // The semaphore is never closed while tasks hold the Arc.
            let _permit = semaphore.acquire().await.unwrap();
            let value = resolve_value(store.as_ref(), &item).await?;
            flatten::map_item(&item.name, &prefix, &value, composite)
        }));
    }

    let mut mapped = Vec::with_capacity(handles.len());
    let mut first_failure: Option<SettingsError> = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(item)) => mapped.push(item),
            Ok(Err(error)) => {
                if first_failure.is_none() {
                    first_failure = Some(error);
                }
            }
            Err(join_error) => {
                if first_failure.is_none() {
                    first_failure = Some(join_error.into());
                }
            }
        }
    }

    match first_failure {
        Some(error) => Err(error),
        None => Ok(mapped),
    }
}

async fn resolve_value(store: &dyn SettingsStore, item: &RemoteItem) -> Result<String> {
    match &item.inline_value {
        Some(value) => Ok(value.clone()),
        None => store.get_value(&item.identifier).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreKind;
    use crate::testing::MemoryStore;

    fn config(store: StoreKind) -> LoaderConfig {
        LoaderConfig::new(store, "/app/prod/", "us-east-1")
    }

    async fn run(
        store: MemoryStore,
        config: &LoaderConfig,
    ) -> Result<(SettingsMap, LoadReport)> {
        load(Arc::new(store), config).await
    }

    #[tokio::test]
    async fn test_two_page_parameter_listing_flattens_by_address() {
        let store = MemoryStore::new()
            .with_page(vec![MemoryStore::item("/app/prod/db/host", Some("h1"))])
            .with_page(vec![MemoryStore::item("/app/prod/db/port", Some("5432"))]);

        let (map, report) = run(store, &config(StoreKind::ParameterStore)).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["db/host"], "h1");
        assert_eq!(map["db/port"], "5432");
        assert_eq!(report.pages, 2);
        assert_eq!(report.items_listed, 2);
        assert_eq!(report.entries, 2);
        assert_eq!(report.collisions, 0);
    }

    #[tokio::test]
    async fn test_sequential_fetches_values_the_listing_left_out() {
        let store = MemoryStore::new()
            .with_page(vec![
                MemoryStore::item("/app/prod/db/password", None),
                MemoryStore::item("/app/prod/api/token", None),
            ])
            .with_value("/app/prod/db/password", "hunter2")
            .with_value("/app/prod/api/token", "t-123");
        let config = config(StoreKind::SecretsManager).with_strategy(FetchStrategy::Sequential);

        let (map, _) = run(store, &config).await.unwrap();

        assert_eq!(map["db/password"], "hunter2");
        assert_eq!(map["api/token"], "t-123");
    }

    #[tokio::test]
    async fn test_concurrent_load_includes_every_item_despite_delays() {
        let store = MemoryStore::new()
            .with_page(vec![
                MemoryStore::item("/app/prod/db/password", None),
                MemoryStore::item("/app/prod/api/token", None),
                MemoryStore::item("/app/prod/cache/url", None),
            ])
            .with_value("/app/prod/db/password", "hunter2")
            .with_value("/app/prod/api/token", "t-123")
            .with_value("/app/prod/cache/url", "redis://c1")
            .with_value_delay_ms("/app/prod/db/password", 30)
            .with_value_delay_ms("/app/prod/api/token", 10);
        let config = config(StoreKind::SecretsManager).with_max_concurrency(2);

        let (map, report) = run(store, &config).await.unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map["db/password"], "hunter2");
        assert_eq!(map["api/token"], "t-123");
        assert_eq!(map["cache/url"], "redis://c1");
        assert_eq!(report.items_listed, 3);
    }

    #[tokio::test]
    async fn test_concurrent_failure_surfaces_after_every_task_finishes() {
        let store = MemoryStore::new()
            .with_page(vec![
                MemoryStore::item("/app/prod/db/password", None),
                MemoryStore::item("/app/prod/api/token", None),
                MemoryStore::item("/app/prod/cache/url", None),
            ])
            .with_value("/app/prod/db/password", "hunter2")
            .with_value("/app/prod/cache/url", "redis://c1")
            .with_value_failure("/app/prod/api/token");
        let store = Arc::new(store);
        let config = config(StoreKind::SecretsManager);

        let store_for_load: Arc<dyn SettingsStore> = store.clone();
        let err = load(store_for_load, &config).await.unwrap_err();

        assert!(matches!(
            &err,
            SettingsError::ValueFetch { identifier, .. } if identifier == "/app/prod/api/token"
        ));
        // The failing task does not cancel its siblings.
        assert_eq!(store.value_calls(), 3);
    }

    #[tokio::test]
    async fn test_later_item_wins_a_collision_and_it_is_counted() {
        // A composite item and a plain one landing on the same address: the
        // plain item is listed second, so its value survives.
        let store = MemoryStore::new()
            .with_page(vec![
                MemoryStore::item("/app/prod/db", Some(r#"{"host":"from-json"}"#)),
                MemoryStore::item("/app/prod/db/host", Some("from-plain")),
            ])
            .with_composite_values();
        let config = config(StoreKind::SecretsManager).with_strategy(FetchStrategy::Sequential);

        let (map, report) = run(store, &config).await.unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map["db/host"], "from-plain");
        assert_eq!(report.collisions, 1);
        assert_eq!(report.composite_items, 1);
    }

    #[tokio::test]
    async fn test_inline_values_skip_the_value_fetch_under_both_strategies() {
        for strategy in [FetchStrategy::Sequential, FetchStrategy::Concurrent] {
            let store = Arc::new(MemoryStore::new().with_page(vec![
                MemoryStore::item("/app/prod/db/host", Some("h1")),
                MemoryStore::item("/app/prod/db/port", Some("5432")),
            ]));
            let config = config(StoreKind::ParameterStore).with_strategy(strategy);

            let store_for_load: Arc<dyn SettingsStore> = store.clone();
            let (map, _) = load(store_for_load, &config).await.unwrap();

            assert_eq!(map.len(), 2);
            assert_eq!(store.value_calls(), 0, "inline values need no fetch");
        }
    }

    #[tokio::test]
    async fn test_empty_listing_yields_an_empty_map() {
        for strategy in [FetchStrategy::Sequential, FetchStrategy::Concurrent] {
            let store = MemoryStore::new();
            let config = config(StoreKind::ParameterStore).with_strategy(strategy);

            let (map, report) = run(store, &config).await.unwrap();

            assert!(map.is_empty());
            assert_eq!(report.pages, 1);
            assert_eq!(report.entries, 0);
        }
    }

    #[test]
    fn test_strategy_parses_and_displays_kebab_case() {
        assert_eq!(
            "sequential".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::Sequential
        );
        assert_eq!(
            "concurrent".parse::<FetchStrategy>().unwrap(),
            FetchStrategy::Concurrent
        );
        assert!("parallel".parse::<FetchStrategy>().is_err());
        assert_eq!(FetchStrategy::Concurrent.to_string(), "concurrent");
    }
}
