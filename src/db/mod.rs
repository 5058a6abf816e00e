use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod migrations;
pub mod queries;

#[cfg(test)]
pub mod test_helpers;

pub use migrations::run_migrations;
pub use queries::*;

pub const DB_FILE_NAME: &str = "vinscan.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Get the ledger database path inside `data_dir`, creating the directory if needed
pub fn get_db_path(data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    Ok(data_dir.join(DB_FILE_NAME))
}

/// Open a ledger database and bring its schema up to date
pub fn open_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open database at {:?}", db_path))?;

    // journal_mode reports the resulting mode as a row
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .context("Failed to enable WAL mode")?;

    conn.busy_timeout(BUSY_TIMEOUT)
        .context("Failed to set busy timeout")?;

    run_migrations(&conn)?;

    Ok(conn)
}

/// Open the ledger database that lives in `data_dir`
pub fn init_db(data_dir: &Path) -> Result<Connection> {
    let db_path = get_db_path(data_dir)?;
    open_db(&db_path)
}
