use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// What one load did, for logs and operator tooling.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// When the load began.
    pub started_at: DateTime<Utc>,
    /// Wall-clock time the whole load took.
    pub elapsed_ms: u64,
    /// Listing pages drained.
    pub pages: usize,
    /// Items the listing returned.
    pub items_listed: usize,
    /// Flattened entries written to the settings map.
    pub entries: usize,
    /// Items whose value was a JSON object and flattened field by field.
    pub composite_items: usize,
    /// Entries overwritten because a later item mapped to the same address.
    pub collisions: usize,
}

impl LoadReport {
    /// Emits the report as a single structured log line.
    pub fn log(&self) {
        info!(
            pages = self.pages,
            items = self.items_listed,
            entries = self.entries,
            composite_items = self.composite_items,
            collisions = self.collisions,
            elapsed_ms = self.elapsed_ms,
            "settings load finished"
        );
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
