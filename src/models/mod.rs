// vinscan data models

pub mod config;
pub mod ledger_entry;
pub mod status;
pub mod verification;
pub mod vin;

// Re-exports for convenience
pub use config::{
    ConfigError, LedgerScope, RecordPolicy, ScannerConfig, SessionConfig, VerificationConfig,
};
pub use ledger_entry::LedgerEntry;
pub use status::{ScanStatus, SessionState, StatusUpdate};
pub use verification::{parse_service_date, CheckVinResponse, VerificationResult};
pub use vin::{ScanCode, Vin};
