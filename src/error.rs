use thiserror::Error;

/// Boxed source error from an underlying store client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors that can occur while loading or reading remote settings.
///
/// Everything except [`SettingsError::MissingSetting`] is fatal to the load
/// that raised it: a failed load produces no usable settings. A missing
/// setting is local to one lookup and leaves the rest of the map valid.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The loader configuration is unusable; detected before any network call.
    #[error("invalid loader configuration: {0}")]
    InvalidConfig(String),

    /// A paginated listing call failed.
    #[error("listing items under '{path}' failed: {source}")]
    Listing {
        path: String,
        #[source]
        source: BoxError,
    },

    /// A secondary value fetch failed.
    #[error("fetching value for '{identifier}' failed: {source}")]
    ValueFetch {
        identifier: String,
        #[source]
        source: BoxError,
    },

    /// The listing returned an item that does not live under the configured
    /// path prefix.
    #[error("item '{name}' is outside the configured prefix '{prefix}'")]
    PrefixMismatch { name: String, prefix: String },

    /// An item carried no value and none could be fetched for it.
    #[error("item '{name}' has no value")]
    MissingValue { name: String },

    /// A fan-out task panicked or was aborted before completing.
    #[error("value fetch task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// No setting exists for the requested `(section, key)` address.
    #[error("no setting for section '{section}' key '{key}'")]
    MissingSetting { section: String, key: String },
}

impl SettingsError {
    /// Check if this error is a lookup miss rather than a load failure.
    ///
    /// Lookup misses are recoverable: the caller can fall back to a default
    /// without discarding the loaded settings.
    pub fn is_missing_setting(&self) -> bool {
        matches!(self, Self::MissingSetting { .. })
    }

    pub(crate) fn listing(
        path: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Listing {
            path: path.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn value_fetch(
        identifier: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ValueFetch {
            identifier: identifier.to_string(),
            source: Box::new(source),
        }
    }
}
