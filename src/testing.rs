//! In-memory [`SettingsStore`] for tests and downstream consumers.
//!
//! Compiled for this crate's own tests and behind the `test-utils` feature so
//! applications embedding the loader can exercise their wiring without AWS
//! credentials. Pages are served in insertion order; the continuation token
//! is the index of the next page.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SettingsError};
use crate::store::{ListPage, RemoteItem, SettingsStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pages: Vec<Vec<RemoteItem>>,
    values: HashMap<String, String>,
    composite: bool,
    fail_listing_on_page: Option<usize>,
    fail_values: HashSet<String>,
    delays_ms: HashMap<String, u64>,
    list_calls: AtomicUsize,
    value_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page to the listing in serve order.
    pub fn with_page(mut self, items: Vec<RemoteItem>) -> Self {
        self.pages.push(items);
        self
    }

    /// Registers the value returned by [`SettingsStore::get_value`] for an
    /// identifier.
    pub fn with_value(mut self, identifier: &str, value: &str) -> Self {
        self.values.insert(identifier.to_string(), value.to_string());
        self
    }

    /// Marks values as composite, the way a secrets store reports them.
    pub fn with_composite_values(mut self) -> Self {
        self.composite = true;
        self
    }

    /// Fails the listing call for the zero-based page index.
    pub fn with_listing_failure_on_page(mut self, page: usize) -> Self {
        self.fail_listing_on_page = Some(page);
        self
    }

    /// Fails every value fetch for the identifier.
    pub fn with_value_failure(mut self, identifier: &str) -> Self {
        self.fail_values.insert(identifier.to_string());
        self
    }

    /// Delays value fetches for the identifier, for concurrency tests.
    pub fn with_value_delay_ms(mut self, identifier: &str, millis: u64) -> Self {
        self.delays_ms.insert(identifier.to_string(), millis);
        self
    }

    /// Builds an item whose identifier is its name, with an optional inline
    /// value.
    pub fn item(name: &str, inline_value: Option<&str>) -> RemoteItem {
        RemoteItem {
            name: name.to_string(),
            identifier: name.to_string(),
            inline_value: inline_value.map(str::to_string),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn value_calls(&self) -> usize {
        self.value_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let index = continuation
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        if self.fail_listing_on_page == Some(index) {
            return Err(SettingsError::listing(
                prefix,
                std::io::Error::other("simulated listing outage"),
            ));
        }

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = if index + 1 < self.pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };
        Ok(ListPage { items, next_token })
    }

    async fn get_value(&self, identifier: &str) -> Result<String> {
        self.value_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(millis) = self.delays_ms.get(identifier) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        if self.fail_values.contains(identifier) {
            return Err(SettingsError::value_fetch(
                identifier,
                std::io::Error::other("simulated fetch outage"),
            ));
        }
        self.values
            .get(identifier)
            .cloned()
            .ok_or_else(|| SettingsError::MissingValue {
                name: identifier.to_string(),
            })
    }

    fn composite_values(&self) -> bool {
        self.composite
    }
}
