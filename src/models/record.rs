use serde::{Deserialize, Serialize};

use super::ScopeKey;

/// Identity of a persisted record: one row per `(name, scope_key)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub name: String,
    /// Normalized scope key. `None` for global (unscoped) features.
    pub scope_key: ScopeKey,
}

impl RecordKey {
    pub fn new(name: impl Into<String>, scope_key: ScopeKey) -> Self {
        Self {
            name: name.into(),
            scope_key,
        }
    }
}

/// A feature's persisted state for one scope.
///
/// `value` is an opaque blob. Backends store and return it byte for byte;
/// only the store knows how to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub name: String,
    pub scope_key: ScopeKey,
    pub value: Vec<u8>,
}

impl FeatureRecord {
    pub fn new(key: RecordKey, value: Vec<u8>) -> Self {
        Self {
            name: key.name,
            scope_key: key.scope_key,
            value,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.name.clone(), self.scope_key.clone())
    }

    /// Split into key and value without cloning.
    pub fn into_parts(self) -> (RecordKey, Vec<u8>) {
        (
            RecordKey {
                name: self.name,
                scope_key: self.scope_key,
            },
            self.value,
        )
    }
}
