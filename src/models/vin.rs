use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scanner::validator::{self, ValidationError};

/// Raw string decoded from a single camera frame, before validation
pub type ScanCode = String;

/// A validated Vehicle Identification Number
///
/// Only constructed through [`validator::validate`], so holding a `Vin` means the
/// value is exactly 17 characters from `[A-HJ-NPR-Z0-9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vin(String);

impl Vin {
    /// Validate a raw code and wrap it
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validator::validate(raw)
    }

    pub(crate) fn from_validated(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Vin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Vin {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validator::validate(&value)
    }
}

impl From<Vin> for String {
    fn from(vin: Vin) -> Self {
        vin.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vin_parse_and_display() {
        let vin = Vin::parse("1HGCM82633A004352").unwrap();
        assert_eq!(vin.as_str(), "1HGCM82633A004352");
        assert_eq!(vin.to_string(), "1HGCM82633A004352");
    }

    #[test]
    fn test_vin_serde_roundtrip_validates() {
        let vin = Vin::parse("1HGCM82633A004352").unwrap();
        let json = serde_json::to_string(&vin).unwrap();
        assert_eq!(json, "\"1HGCM82633A004352\"");

        let back: Vin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vin);

        let invalid: Result<Vin, _> = serde_json::from_str("\"1HGCM82633A00435I\"");
        assert!(invalid.is_err());
    }
}
