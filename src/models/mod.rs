//! Domain models for feature state.
//!
//! # Core Concepts
//!
//! - [`Scope`]: the entity a feature is evaluated against (user, tenant, ...),
//!   or [`Scope::Global`] when the feature is not scoped at all.
//! - [`ScopeKey`]: the normalized string identity of a scope, used as the
//!   storage key. Produced by [`resolve_key`].
//! - [`FeatureRecord`]: the persisted `(feature, scope key, value)` triple.

mod record;
mod scope;

pub use record::*;
pub use scope::*;
