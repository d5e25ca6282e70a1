//! Lazy resolve-and-persist orchestration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::db::PersistenceBackend;
use crate::error::{Error, Result};
use crate::events::{EventSink, FeatureEvent, TracingSink};
use crate::models::{FeatureRecord, RecordKey, Scope};
use crate::registry::ResolverRegistry;

/// Resolves, caches and persists feature state per scope.
///
/// Register resolvers first (`register` takes `&mut self`), then share the
/// store, e.g. behind an `Arc`; every read and write path takes `&self`.
///
/// First access to a pair is check-then-act: two callers racing on the same
/// new pair may both run the resolver. Backends keep the first insert, so the
/// table still ends up with a single record.
pub struct FeatureStateStore<B> {
    backend: B,
    registry: ResolverRegistry,
    sink: Arc<dyn EventSink>,
}

impl<B: PersistenceBackend> FeatureStateStore<B> {
    /// A store that reports resolutions through [`TracingSink`].
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            registry: ResolverRegistry::new(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_registry(mut self, registry: ResolverRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Register the initial-value resolver for `feature`, replacing any previous one.
    pub fn register<F>(&mut self, feature: impl Into<String>, resolver: F)
    where
        F: Fn(&Scope) -> Value + Send + Sync + 'static,
    {
        self.registry.register(feature, resolver);
    }

    pub fn is_registered(&self, feature: &str) -> bool {
        self.registry.contains(feature)
    }

    pub fn registered_features(&self) -> Vec<&str> {
        self.registry.features()
    }

    /// Current state of `feature` for `scope`, resolving and persisting it on first access.
    pub fn get(&self, feature: &str, scope: &Scope) -> Result<Value> {
        let key = RecordKey::new(feature, scope.key());

        if let Some(record) = self.backend.lookup_one(&key)? {
            tracing::debug!(%feature, %scope, "Feature state hit");
            return decode(&key, &record.value);
        }

        tracing::debug!(%feature, %scope, "Feature state miss");
        let value = self.resolve(feature, scope);
        let blob = encode(feature, &value)?;
        self.backend.insert_one(&FeatureRecord::new(key, blob))?;
        Ok(value)
    }

    /// [`get`](Self::get), converted to `T`.
    pub fn get_as<T: DeserializeOwned>(&self, feature: &str, scope: &Scope) -> Result<T> {
        let value = self.get(feature, scope)?;
        serde_json::from_value(value).map_err(|source| Error::ValueType {
            feature: feature.to_string(),
            source,
        })
    }

    /// Store `value` as the state of `feature` for `scope`.
    ///
    /// Update first, insert when no row was changed. The two calls are not
    /// atomic together.
    pub fn set(&self, feature: &str, scope: &Scope, value: Value) -> Result<()> {
        let blob = encode(feature, &value)?;
        let record = FeatureRecord::new(RecordKey::new(feature, scope.key()), blob);

        if !self.backend.update_one(&record)? {
            tracing::debug!(%feature, %scope, "No existing feature state, inserting");
            self.backend.insert_one(&record)?;
        }
        Ok(())
    }

    /// Batched [`get`](Self::get) for many features and scopes.
    ///
    /// Issues one lookup for all distinct pairs and, when some are missing,
    /// one insert for all of them. Each output list lines up with the
    /// corresponding input list, duplicates included. A feature listed more
    /// than once has its scope lists concatenated.
    pub fn load<I, K>(&self, request: I) -> Result<HashMap<String, Vec<Value>>>
    where
        I: IntoIterator<Item = (K, Vec<Scope>)>,
        K: Into<String>,
    {
        let mut requested: Vec<(String, Vec<Scope>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (feature, scopes) in request {
            let feature = feature.into();
            match positions.get(&feature) {
                Some(&index) => requested[index].1.extend(scopes),
                None => {
                    positions.insert(feature.clone(), requested.len());
                    requested.push((feature, scopes));
                }
            }
        }

        if requested.iter().all(|(_, scopes)| scopes.is_empty()) {
            return Ok(requested
                .into_iter()
                .map(|(feature, _)| (feature, Vec::new()))
                .collect());
        }

        // Distinct pairs in first-seen order, each with the scope that produced it.
        let mut keys: Vec<RecordKey> = Vec::new();
        let mut first_scopes: Vec<&Scope> = Vec::new();
        let mut seen: HashSet<RecordKey> = HashSet::new();
        for (feature, scopes) in &requested {
            for scope in scopes {
                let key = RecordKey::new(feature.as_str(), scope.key());
                if seen.insert(key.clone()) {
                    keys.push(key);
                    first_scopes.push(scope);
                }
            }
        }

        let mut known: HashMap<RecordKey, Value> = HashMap::with_capacity(keys.len());
        for record in self.backend.lookup_many(&keys)? {
            let (key, blob) = record.into_parts();
            let value = decode(&key, &blob)?;
            known.insert(key, value);
        }

        let mut inserts: Vec<FeatureRecord> = Vec::new();
        for (key, scope) in keys.iter().zip(first_scopes) {
            if known.contains_key(key) {
                continue;
            }
            let value = self.resolve(&key.name, scope);
            inserts.push(FeatureRecord::new(key.clone(), encode(&key.name, &value)?));
            known.insert(key.clone(), value);
        }

        tracing::debug!(
            pairs = keys.len(),
            misses = inserts.len(),
            "Loaded feature states"
        );

        if !inserts.is_empty() {
            self.backend.insert_many(&inserts)?;
        }

        let mut result = HashMap::with_capacity(requested.len());
        for (feature, scopes) in requested {
            let values = scopes
                .iter()
                .map(|scope| known[&RecordKey::new(feature.as_str(), scope.key())].clone())
                .collect();
            result.insert(feature, values);
        }
        Ok(result)
    }

    fn resolve(&self, feature: &str, scope: &Scope) -> Value {
        match self.registry.get(feature) {
            Some(resolver) => {
                let value = resolver(scope);
                self.sink.notify(&FeatureEvent::KnownFeatureResolved {
                    feature: feature.to_string(),
                    scope: scope.clone(),
                    value: value.clone(),
                });
                value
            }
            None => {
                self.sink.notify(&FeatureEvent::UnknownFeatureResolved {
                    feature: feature.to_string(),
                    scope: scope.clone(),
                });
                Value::Bool(false)
            }
        }
    }
}

fn encode(feature: &str, value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|source| Error::Encode {
        feature: feature.to_string(),
        source,
    })
}

fn decode(key: &RecordKey, blob: &[u8]) -> Result<Value> {
    serde_json::from_slice(blob).map_err(|source| {
        tracing::warn!(feature = %key.name, scope = ?key.scope_key, "Corrupt feature record");
        Error::CorruptRecord {
            feature: key.name.clone(),
            scope_key: key.scope_key.clone(),
            source,
        }
    })
}
