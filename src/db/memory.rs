//! In-process backend with call accounting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

use super::PersistenceBackend;
use crate::models::{FeatureRecord, RecordKey};

/// Number of calls a [`MemoryBackend`] has served, by operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub point_lookups: usize,
    pub batch_lookups: usize,
    pub point_inserts: usize,
    pub batch_inserts: usize,
    pub updates: usize,
}

impl BackendStats {
    /// Lookup calls of either kind.
    pub fn lookups(&self) -> usize {
        self.point_lookups + self.batch_lookups
    }

    /// Insert calls of either kind.
    pub fn inserts(&self) -> usize {
        self.point_inserts + self.batch_inserts
    }
}

#[derive(Debug, Default)]
struct Counters {
    point_lookups: AtomicUsize,
    batch_lookups: AtomicUsize,
    point_inserts: AtomicUsize,
    batch_inserts: AtomicUsize,
    updates: AtomicUsize,
}

/// A `HashMap` table behind a mutex. Nothing is persisted across processes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: Mutex<HashMap<RecordKey, Vec<u8>>>,
    counters: Counters,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BackendStats {
        BackendStats {
            point_lookups: self.counters.point_lookups.load(Ordering::Relaxed),
            batch_lookups: self.counters.batch_lookups.load(Ordering::Relaxed),
            point_inserts: self.counters.point_inserts.load(Ordering::Relaxed),
            batch_inserts: self.counters.batch_inserts.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
        }
    }

    /// Zero the call counters; stored rows are kept.
    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.point_lookups,
            &self.counters.batch_lookups,
            &self.counters.point_inserts,
            &self.counters.batch_inserts,
            &self.counters.updates,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.rows().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw stored blob for a pair, bypassing the call counters.
    pub fn raw_value(&self, key: &RecordKey) -> Option<Vec<u8>> {
        self.rows().ok()?.get(key).cloned()
    }

    fn rows(&self) -> Result<MutexGuard<'_, HashMap<RecordKey, Vec<u8>>>> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned"))
    }
}

impl PersistenceBackend for MemoryBackend {
    fn lookup_one(&self, key: &RecordKey) -> Result<Option<FeatureRecord>> {
        self.counters.point_lookups.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows()?;
        Ok(rows
            .get(key)
            .map(|value| FeatureRecord::new(key.clone(), value.clone())))
    }

    fn lookup_many(&self, keys: &[RecordKey]) -> Result<Vec<FeatureRecord>> {
        self.counters.batch_lookups.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows()?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                rows.get(key)
                    .map(|value| FeatureRecord::new(key.clone(), value.clone()))
            })
            .collect())
    }

    fn insert_one(&self, record: &FeatureRecord) -> Result<()> {
        self.counters.point_inserts.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.rows()?;
        rows.entry(record.key())
            .or_insert_with(|| record.value.clone());
        Ok(())
    }

    fn insert_many(&self, records: &[FeatureRecord]) -> Result<()> {
        self.counters.batch_inserts.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.rows()?;
        for record in records {
            rows.entry(record.key())
                .or_insert_with(|| record.value.clone());
        }
        Ok(())
    }

    fn update_one(&self, record: &FeatureRecord) -> Result<bool> {
        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.rows()?;
        match rows.get_mut(&record.key()) {
            Some(value) => {
                value.clone_from(&record.value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, scope: Option<&str>, value: &[u8]) -> FeatureRecord {
        FeatureRecord {
            name: name.to_string(),
            scope_key: scope.map(str::to_string),
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_insert_keeps_first_writer() {
        let backend = MemoryBackend::new();
        backend.insert_one(&record("f", Some("a"), b"1")).unwrap();
        backend.insert_one(&record("f", Some("a"), b"2")).unwrap();

        let found = backend
            .lookup_one(&RecordKey::new("f", Some("a".to_string())))
            .unwrap()
            .unwrap();
        assert_eq!(found.value, b"1");
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_update_reports_missing_row() {
        let backend = MemoryBackend::new();
        assert!(!backend.update_one(&record("f", None, b"1")).unwrap());

        backend.insert_one(&record("f", None, b"1")).unwrap();
        assert!(backend.update_one(&record("f", None, b"2")).unwrap());
        assert_eq!(
            backend.raw_value(&RecordKey::new("f", None)),
            Some(b"2".to_vec())
        );
    }

    #[test]
    fn test_global_and_scoped_rows_are_distinct() {
        let backend = MemoryBackend::new();
        backend
            .insert_many(&[record("f", None, b"g"), record("f", Some("u"), b"s")])
            .unwrap();

        let found = backend
            .lookup_many(&[
                RecordKey::new("f", None),
                RecordKey::new("f", Some("u".to_string())),
                RecordKey::new("f", Some("missing".to_string())),
            ])
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_stats_count_calls() {
        let backend = MemoryBackend::new();
        backend.lookup_many(&[]).unwrap();
        backend.lookup_one(&RecordKey::new("f", None)).unwrap();
        backend.insert_many(&[]).unwrap();

        let stats = backend.stats();
        assert_eq!(stats.batch_lookups, 1);
        assert_eq!(stats.point_lookups, 1);
        assert_eq!(stats.lookups(), 2);
        assert_eq!(stats.inserts(), 1);

        backend.reset_stats();
        assert_eq!(backend.stats(), BackendStats::default());
    }
}
