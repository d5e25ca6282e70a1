//! rusqlite-backed durable feature table.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, ToSql};

use super::{schema, PersistenceBackend};
use crate::config::BackendConfig;
use crate::models::{FeatureRecord, RecordKey};

/// Bound-parameter ceiling of the bundled SQLite build.
const MAX_VARIABLES: usize = 32_766;
/// Each looked-up pair binds a name and a scope.
const MAX_KEYS_PER_LOOKUP: usize = MAX_VARIABLES / 2;

const INSERT_SQL: &str = "INSERT INTO features (name, scope, value, created_at, updated_at)
     VALUES (?, ?, ?, ?, ?)
     ON CONFLICT DO NOTHING";

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn open(path: PathBuf) -> Result<Self> {
        Self::open_with_config(&BackendConfig::with_path(path))
    }

    pub fn open_with_config(config: &BackendConfig) -> Result<Self> {
        let path = match &config.database_path {
            Some(path) => path.clone(),
            None => default_path()?,
        };
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(config.busy_timeout)?;

        tracing::debug!("Opened feature database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open_with_config(&BackendConfig::default())
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the `features` table and its indexes if they are missing.
    pub fn install_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        schema::install(&conn)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))?;
        Ok(usize::try_from(count)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }
}

impl PersistenceBackend for SqliteBackend {
    fn lookup_one(&self, key: &RecordKey) -> Result<Option<FeatureRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT name, scope, value FROM features WHERE name = ? AND scope IS ?")?;

        let mut rows = stmt.query((&key.name, &key.scope_key))?;
        if let Some(row) = rows.next()? {
            Ok(Some(FeatureRecord {
                name: row.get(0)?,
                scope_key: row.get(1)?,
                value: row.get(2)?,
            }))
        } else {
            Ok(None)
        }
    }

    fn lookup_many(&self, keys: &[RecordKey]) -> Result<Vec<FeatureRecord>> {
        let conn = self.conn()?;
        let mut records = Vec::new();

        for chunk in keys.chunks(MAX_KEYS_PER_LOOKUP) {
            // A VALUES table keeps expression depth flat no matter how many pairs are bound.
            let wanted = vec!["(?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "WITH wanted(name, scope) AS (VALUES {wanted})
                 SELECT f.name, f.scope, f.value FROM features f
                 JOIN wanted w ON f.name = w.name AND f.scope IS w.scope"
            );

            let mut params: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() * 2);
            for key in chunk {
                params.push(&key.name);
                params.push(&key.scope_key);
            }

            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(FeatureRecord {
                        name: row.get(0)?,
                        scope_key: row.get(1)?,
                        value: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            records.extend(found);
        }

        Ok(records)
    }

    fn insert_one(&self, record: &FeatureRecord) -> Result<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            INSERT_SQL,
            (&record.name, &record.scope_key, &record.value, &now, &now),
        )
        .with_context(|| format!("Failed to insert feature '{}'", record.name))?;
        Ok(())
    }

    fn insert_many(&self, records: &[FeatureRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for record in records {
                stmt.execute((&record.name, &record.scope_key, &record.value, &now, &now))
                    .with_context(|| format!("Failed to insert feature '{}'", record.name))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update_one(&self, record: &FeatureRecord) -> Result<bool> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE features SET value = ?, updated_at = ? WHERE name = ? AND scope IS ?",
            (&record.value, &now, &record.name, &record.scope_key),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for SqliteBackend {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "feature-state")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("features.db"))
}
