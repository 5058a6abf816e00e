use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{Ledger, LedgerError};
use crate::db;
use crate::models::{LedgerEntry, Vin};

/// SQLite-backed ledger that survives restarts
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open `vinscan.db` inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, LedgerError> {
        let conn = db::init_db(data_dir).map_err(read_error)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap a connection that already has the schema applied
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|e| LedgerError::Read {
            message: format!("ledger connection lock poisoned: {}", e),
        })
    }
}

impl Ledger for SqliteLedger {
    fn contains(&self, vin: &Vin) -> Result<bool, LedgerError> {
        let conn = self.lock()?;
        db::vin_record_exists(&conn, vin).map_err(read_error)
    }

    fn record(&self, vin: &Vin, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let mut conn = self.lock()?;

        let tx = conn.transaction().map_err(|e| persistence_error(e.into()))?;
        let inserted = db::insert_vin_record(&tx, vin, at).map_err(persistence_error)?;
        tx.commit().map_err(|e| persistence_error(e.into()))?;

        if inserted {
            tracing::debug!("Recorded {} in ledger", vin);
        } else {
            tracing::debug!("{} already in ledger, keeping first scan date", vin);
        }
        Ok(())
    }

    fn entry(&self, vin: &Vin) -> Result<Option<LedgerEntry>, LedgerError> {
        let conn = self.lock()?;
        db::select_vin_record(&conn, vin).map_err(read_error)
    }

    fn len(&self) -> Result<usize, LedgerError> {
        let conn = self.lock()?;
        db::count_vin_records(&conn).map_err(read_error)
    }
}

fn read_error(error: anyhow::Error) -> LedgerError {
    LedgerError::Read {
        message: format!("{:#}", error),
    }
}

fn persistence_error(error: anyhow::Error) -> LedgerError {
    LedgerError::Persistence {
        message: format!("{:#}", error),
    }
}
