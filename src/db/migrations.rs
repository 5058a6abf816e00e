use anyhow::{Context, Result};
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Index creation statements, safe to run on every init (IF NOT EXISTS)
const INDEX_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_vin_records_scan_date ON vin_records(scan_date);
";

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Get current database schema version
pub fn get_schema_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to get schema version")?;
    Ok(version)
}

/// Set database schema version
fn set_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {}", version))
        .context("Failed to set schema version")?;
    Ok(())
}

/// Migrate from v0 (empty) to v1 (vin_records ledger table)
fn migrate_to_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .context("Failed to execute v1 schema migration")?;

    conn.execute_batch(INDEX_SQL)
        .context("Failed to create v1 indexes")?;

    Ok(())
}

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`]
///
/// Only runs missing steps, so it is safe to call on every open.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        anyhow::bail!(
            "Database schema version {} is newer than supported version {}",
            current_version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if current_version < 1 {
        migrate_to_v1(conn)?;
        set_schema_version(conn, 1)?;
        tracing::debug!("Ledger schema migrated to v1");
    }

    Ok(())
}
