use thiserror::Error;

use crate::models::ScopeKey;

/// Errors surfaced by [`FeatureStateStore`](crate::FeatureStateStore).
#[derive(Debug, Error)]
pub enum Error {
    /// The backend failed. Passed through untouched; retry policy belongs to the caller.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    /// A stored value could not be decoded.
    #[error("corrupt record for feature '{feature}' (scope {scope_key:?}): {source}")]
    CorruptRecord {
        feature: String,
        scope_key: ScopeKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for feature '{feature}': {source}")]
    Encode {
        feature: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stored value is valid but not of the type the caller asked for.
    #[error("value of feature '{feature}' has an unexpected type: {source}")]
    ValueType {
        feature: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
