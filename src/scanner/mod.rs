//! Scan-to-verification pipeline
//!
//! Frame intake, code validation and the session state machine that drives
//! verification.

pub mod frame;
pub mod session;
pub mod validator;

pub use frame::{CodeDecoder, Frame, FrameFeed, FrameSubmit, SymbolDecoder};
pub use session::{ScanSession, SessionError, SessionHandle, StatusBroadcaster, STATUS_BUFFER};
pub use validator::{validate, ValidationError, VIN_LENGTH};
