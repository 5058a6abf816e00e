use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Vin;

/// A VIN the local ledger has seen, with the date of its first recorded scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub vin: Vin,
    pub scan_date: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(vin: Vin, scan_date: DateTime<Utc>) -> Self {
        Self { vin, scan_date }
    }
}
