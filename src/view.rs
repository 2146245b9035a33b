//! Read-only access to a finished load.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{Result, SettingsError};
use crate::flatten;

/// Flattened settings keyed by the `section/key` composite.
pub type SettingsMap = HashMap<String, String>;

/// Immutable snapshot of every setting a load produced.
///
/// The view never refreshes itself; reloading means running the loader again
/// and swapping in the new view.
#[derive(Debug, Clone)]
pub struct SettingsView {
    settings: SettingsMap,
    loaded_at: DateTime<Utc>,
}

impl SettingsView {
    pub(crate) fn new(settings: SettingsMap, loaded_at: DateTime<Utc>) -> Self {
        Self {
            settings,
            loaded_at,
        }
    }

    /// Looks up one setting by section and key.
    ///
    /// A miss is recoverable: callers layering several sources match it
    /// with [`SettingsError::is_missing_setting`] and fall through to the
    /// next source.
    pub fn get_setting(&self, section: &str, key: &str) -> Result<&str> {
        self.settings
            .get(&flatten::composite_key(section, key))
            .map(String::as_str)
            .ok_or_else(|| SettingsError::MissingSetting {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Iterates over `section/key` composites and values, in no fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// When the snapshot was taken.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
