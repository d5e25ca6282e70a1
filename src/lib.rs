//! Lazily resolved, durably persisted feature state.
//!
//! A [`FeatureStateStore`] answers "what is the state of feature `f` for
//! scope `s`?". The first time a pair is asked about, the feature's
//! registered resolver computes the value, an event is emitted, and the
//! result is written to a [`PersistenceBackend`]. Every later lookup is
//! served from the backend.
//!
//! ```no_run
//! use feature_state::db::SqliteBackend;
//! use feature_state::{FeatureStateStore, Scope};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let backend = SqliteBackend::open_default()?;
//! backend.install_schema()?;
//!
//! let mut store = FeatureStateStore::new(backend);
//! store.register("beta-search", |scope: &Scope| json!(scope.key().is_some()));
//!
//! let enabled: bool = store.get_as("beta-search", &Scope::entity("user", 42))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod registry;
pub mod store;

pub use db::PersistenceBackend;
pub use error::{Error, Result};
pub use events::{EventSink, FeatureEvent};
pub use models::{resolve_key, Entity, FeatureRecord, RecordKey, Scope, ScopeIdentifier, ScopeKey};
pub use registry::{Resolver, ResolverRegistry};
pub use store::FeatureStateStore;
