use anyhow::{Context, Result};
use rusqlite::Connection;

struct SchemaObject {
    name: &'static str,
    sql: &'static str,
}

const SCHEMA: &[SchemaObject] = &[
    SchemaObject {
        name: "features",
        sql: "CREATE TABLE IF NOT EXISTS features (
            name TEXT NOT NULL,
            scope TEXT,
            value BLOB NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    },
    SchemaObject {
        name: "idx_features_name_scope",
        sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_features_name_scope
            ON features(name, scope)",
    },
    // SQLite treats NULLs as distinct in unique indexes, so global rows need their own.
    SchemaObject {
        name: "idx_features_global",
        sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_features_global
            ON features(name) WHERE scope IS NULL",
    },
];

pub fn install(conn: &Connection) -> Result<()> {
    let missing = missing_objects(conn)?;
    if missing.is_empty() {
        return Ok(());
    }

    let sql = SCHEMA
        .iter()
        .map(|object| object.sql)
        .collect::<Vec<_>>()
        .join(";\n");

    conn.execute_batch(&format!("BEGIN TRANSACTION; {sql}; COMMIT;"))
        .context("Failed to install features schema")?;

    tracing::info!("Installed features schema objects: {}", missing.join(", "));
    Ok(())
}

fn missing_objects(conn: &Connection) -> Result<Vec<&'static str>> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE name = ?")?;
    let mut missing = Vec::new();
    for object in SCHEMA {
        let count: i32 = stmt.query_row([object.name], |row| row.get(0))?;
        if count == 0 {
            missing.push(object.name);
        }
    }
    Ok(missing)
}
