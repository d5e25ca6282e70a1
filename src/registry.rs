//! Feature name → initial-value resolver mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::models::Scope;

/// Computes a feature's initial value for a scope.
///
/// Resolvers are expected to be pure: the store calls one only when no
/// record exists, and racing first accesses may call it more than once.
pub type Resolver = Arc<dyn Fn(&Scope) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, Resolver>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resolver` for `feature`, replacing any previous one.
    pub fn register<F>(&mut self, feature: impl Into<String>, resolver: F)
    where
        F: Fn(&Scope) -> Value + Send + Sync + 'static,
    {
        let feature = feature.into();
        if self
            .resolvers
            .insert(feature.clone(), Arc::new(resolver))
            .is_some()
        {
            tracing::debug!(%feature, "Replaced feature resolver");
        }
    }

    pub fn get(&self, feature: &str) -> Option<&Resolver> {
        self.resolvers.get(feature)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.resolvers.contains_key(feature)
    }

    /// Registered feature names, sorted.
    pub fn features(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("features", &self.features())
            .finish()
    }
}
