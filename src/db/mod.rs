//! Durable storage for feature records.
//!
//! The store only talks to storage through [`PersistenceBackend`]. Two
//! implementations ship with the crate: [`SqliteBackend`] for durable
//! state and [`MemoryBackend`] for tests and embedding.

pub mod memory;
mod schema;
pub mod sqlite;

use std::sync::Arc;

use anyhow::Result;

use crate::models::{FeatureRecord, RecordKey};

pub use memory::{BackendStats, MemoryBackend};
pub use sqlite::SqliteBackend;

/// A key-value table of feature records keyed by `(name, scope_key)`.
///
/// Calls are independent: no transaction spans two calls. Inserting a pair
/// that already exists must leave the existing row in place and succeed, so
/// concurrent first accesses converge on a single record.
pub trait PersistenceBackend: Send + Sync {
    /// Fetch a single record.
    fn lookup_one(&self, key: &RecordKey) -> Result<Option<FeatureRecord>> {
        Ok(self.lookup_many(std::slice::from_ref(key))?.into_iter().next())
    }

    /// Fetch every existing record among `keys`. Missing pairs are absent
    /// from the result; order is unspecified.
    fn lookup_many(&self, keys: &[RecordKey]) -> Result<Vec<FeatureRecord>>;

    fn insert_one(&self, record: &FeatureRecord) -> Result<()>;

    fn insert_many(&self, records: &[FeatureRecord]) -> Result<()>;

    /// Replace the value of an existing record. Returns `false` when no
    /// record exists for the pair.
    fn update_one(&self, record: &FeatureRecord) -> Result<bool>;
}

impl<B: PersistenceBackend + ?Sized> PersistenceBackend for Arc<B> {
    fn lookup_one(&self, key: &RecordKey) -> Result<Option<FeatureRecord>> {
        (**self).lookup_one(key)
    }

    fn lookup_many(&self, keys: &[RecordKey]) -> Result<Vec<FeatureRecord>> {
        (**self).lookup_many(keys)
    }

    fn insert_one(&self, record: &FeatureRecord) -> Result<()> {
        (**self).insert_one(record)
    }

    fn insert_many(&self, records: &[FeatureRecord]) -> Result<()> {
        (**self).insert_many(records)
    }

    fn update_one(&self, record: &FeatureRecord) -> Result<bool> {
        (**self).update_one(record)
    }
}

impl<B: PersistenceBackend + ?Sized> PersistenceBackend for &B {
    fn lookup_one(&self, key: &RecordKey) -> Result<Option<FeatureRecord>> {
        (**self).lookup_one(key)
    }

    fn lookup_many(&self, keys: &[RecordKey]) -> Result<Vec<FeatureRecord>> {
        (**self).lookup_many(keys)
    }

    fn insert_one(&self, record: &FeatureRecord) -> Result<()> {
        (**self).insert_one(record)
    }

    fn insert_many(&self, records: &[FeatureRecord]) -> Result<()> {
        (**self).insert_many(records)
    }

    fn update_one(&self, record: &FeatureRecord) -> Result<bool> {
        (**self).update_one(record)
    }
}
