use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Ledger, LedgerError};
use crate::models::{LedgerEntry, Vin};

/// Session-scoped ledger, forgotten when dropped
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<Vin, DateTime<Utc>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Vin, DateTime<Utc>>>, LedgerError> {
        self.entries.lock().map_err(|e| LedgerError::Read {
            message: format!("ledger lock poisoned: {}", e),
        })
    }
}

impl Ledger for MemoryLedger {
    fn contains(&self, vin: &Vin) -> Result<bool, LedgerError> {
        Ok(self.lock()?.contains_key(vin))
    }

    fn record(&self, vin: &Vin, at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.lock()?.entry(vin.clone()).or_insert(at);
        Ok(())
    }

    fn entry(&self, vin: &Vin) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self
            .lock()?
            .get(vin)
            .map(|scan_date| LedgerEntry::new(vin.clone(), *scan_date)))
    }

    fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_scan_date_wins() {
        let ledger = MemoryLedger::new();
        let vin = Vin::parse("1HGCM82633A004352").unwrap();
        let first = Utc::now();

        ledger.record(&vin, first).unwrap();
        ledger.record(&vin, first + Duration::minutes(5)).unwrap();

        assert_eq!(ledger.len().unwrap(), 1);
        assert_eq!(ledger.entry(&vin).unwrap().unwrap().scan_date, first);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = MemoryLedger::new();
        let vin = Vin::parse("1HGCM82633A004352").unwrap();

        assert!(ledger.is_empty().unwrap());
        assert!(!ledger.contains(&vin).unwrap());
        assert!(ledger.entry(&vin).unwrap().is_none());
    }
}
