//! Verification client contract

use async_trait::async_trait;

use crate::models::{VerificationResult, Vin};

/// Failures a verification call can report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// No network path to the service (connect failure, timeout, broken connection)
    #[error("Transport error: {message}")]
    Transport { message: String },
    /// The service answered with a non-success status
    #[error("Server error ({status})")]
    Server { status: u16 },
    /// The response body did not match the expected contract
    #[error("Failed to decode verification response: {message}")]
    Decoding { message: String },
}

impl VerificationError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            VerificationError::Server { status } => Some(*status),
            _ => None,
        }
    }
}

/// Looks up a VIN against the remote record service
///
/// One call issues exactly one request. Implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationClient: Send + Sync {
    async fn verify(&self, vin: &Vin) -> Result<VerificationResult, VerificationError>;
}
