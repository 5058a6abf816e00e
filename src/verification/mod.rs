//! Remote VIN verification
//!
//! The session talks to the [`VerificationClient`] trait; [`HttpVerificationClient`]
//! is the production implementation.

pub mod client;
pub mod http;

pub use client::{VerificationClient, VerificationError};
pub use http::{HttpVerificationClient, ServiceHealth};

#[cfg(test)]
pub use client::MockVerificationClient;
