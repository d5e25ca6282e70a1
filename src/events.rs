//! Notifications emitted when a feature is resolved for the first time.
//!
//! Sinks are fire-and-forget: the store never looks at what a sink does
//! with an event, and a sink cannot influence the resolved value.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::models::Scope;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeatureEvent {
    /// A feature with no registered resolver was resolved to the default `false`.
    UnknownFeatureResolved {
        feature: String,
        #[serde(serialize_with = "serialize_scope")]
        scope: Scope,
    },
    /// A registered resolver produced the initial value for a scope.
    KnownFeatureResolved {
        feature: String,
        #[serde(serialize_with = "serialize_scope")]
        scope: Scope,
        value: Value,
    },
}

impl FeatureEvent {
    pub fn feature(&self) -> &str {
        match self {
            Self::UnknownFeatureResolved { feature, .. }
            | Self::KnownFeatureResolved { feature, .. } => feature,
        }
    }

    pub fn scope(&self) -> &Scope {
        match self {
            Self::UnknownFeatureResolved { scope, .. }
            | Self::KnownFeatureResolved { scope, .. } => scope,
        }
    }
}

fn serialize_scope<S: serde::Serializer>(scope: &Scope, serializer: S) -> Result<S::Ok, S::Error> {
    match scope.key() {
        Some(key) => serializer.serialize_some(&key),
        None => serializer.serialize_none(),
    }
}

pub trait EventSink: Send + Sync {
    fn notify(&self, event: &FeatureEvent);
}

impl<F> EventSink for F
where
    F: Fn(&FeatureEvent) + Send + Sync,
{
    fn notify(&self, event: &FeatureEvent) {
        self(event)
    }
}

/// Default sink: reports resolutions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, event: &FeatureEvent) {
        match event {
            FeatureEvent::UnknownFeatureResolved { feature, scope } => {
                tracing::warn!(%feature, %scope, "Resolved unknown feature to default");
            }
            FeatureEvent::KnownFeatureResolved {
                feature,
                scope,
                value,
            } => {
                tracing::debug!(%feature, %scope, %value, "Resolved feature initial value");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: &FeatureEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<FeatureEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<FeatureEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectingSink {
    fn notify(&self, event: &FeatureEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
