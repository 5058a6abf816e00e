//! Local duplicate ledger
//!
//! Remembers which VINs have already been scanned so a repeat scan can be reported
//! without asking the remote service again. Entries are only ever added.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::models::{LedgerEntry, LedgerScope, Vin};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

/// Ledger failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The backing store could not be written
    #[error("Failed to persist ledger entry: {message}")]
    Persistence { message: String },
    /// The backing store could not be read
    #[error("Failed to read ledger: {message}")]
    Read { message: String },
}

/// Membership store for previously scanned VINs
///
/// A VIN appears at most once. Recording a VIN that is already present keeps the
/// original scan date.
pub trait Ledger: Send + Sync {
    fn contains(&self, vin: &Vin) -> Result<bool, LedgerError>;

    fn record(&self, vin: &Vin, at: DateTime<Utc>) -> Result<(), LedgerError>;

    fn entry(&self, vin: &Vin) -> Result<Option<LedgerEntry>, LedgerError>;

    fn len(&self) -> Result<usize, LedgerError>;

    fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

/// Open the ledger matching `scope`
///
/// `data_dir` is only touched for [`LedgerScope::Persistent`].
pub fn open_ledger(scope: LedgerScope, data_dir: &Path) -> Result<Arc<dyn Ledger>, LedgerError> {
    match scope {
        LedgerScope::Persistent => Ok(Arc::new(SqliteLedger::open(data_dir)?)),
        LedgerScope::Session => Ok(Arc::new(MemoryLedger::new())),
    }
}
