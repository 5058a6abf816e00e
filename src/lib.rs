// vinscan - VIN barcode scan-to-verification pipeline
// Module re-exports

pub mod db;
pub mod ledger;
pub mod models;
pub mod scanner;
pub mod utils;
pub mod verification;

// Re-export commonly used types
pub use models::{
    LedgerEntry, LedgerScope, RecordPolicy, ScanCode, ScanStatus, ScannerConfig, SessionConfig,
    SessionState, StatusUpdate, VerificationConfig, VerificationResult, Vin,
};

pub use ledger::{open_ledger, Ledger, LedgerError, MemoryLedger, SqliteLedger};
pub use scanner::{
    validate, CodeDecoder, Frame, FrameFeed, FrameSubmit, ScanSession, SessionError,
    SessionHandle, SymbolDecoder, ValidationError,
};
pub use verification::{HttpVerificationClient, VerificationClient, VerificationError};
