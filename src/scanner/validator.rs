//! VIN syntax validation
//!
//! A VIN is exactly 17 characters drawn from digits and upper-case letters,
//! excluding I, O and Q (too easily confused with 1 and 0).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Vin;

pub const VIN_LENGTH: usize = 17;

/// Characters allowed in a VIN, as the body of a regex character class
const VIN_ALPHABET: &str = "A-HJ-NPR-Z0-9";

static INVALID_CHAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("[^{}]", VIN_ALPHABET)).expect("VIN alphabet is a valid character class")
});

/// Why a decoded code was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("VIN too short: {length} characters, expected 17")]
    TooShort { length: usize },
    #[error("VIN too long: {length} characters, expected 17")]
    TooLong { length: usize },
    #[error("Invalid VIN character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::TooShort { .. } => "too_short",
            ValidationError::TooLong { .. } => "too_long",
            ValidationError::InvalidCharacter { .. } => "invalid_character",
        }
    }
}

/// Whether `c` may appear in a VIN
pub fn is_vin_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    !INVALID_CHAR.is_match(c.encode_utf8(&mut buf))
}

/// Validate a raw decoded code
///
/// Pure and deterministic: no trimming, no case folding.
pub fn validate(raw: &str) -> Result<Vin, ValidationError> {
    let length = raw.chars().count();

    if length < VIN_LENGTH {
        return Err(ValidationError::TooShort { length });
    }
    if length > VIN_LENGTH {
        return Err(ValidationError::TooLong { length });
    }

    if let Some(found) = INVALID_CHAR.find(raw) {
        let position = raw[..found.start()].chars().count();
        let character = found
            .as_str()
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Err(ValidationError::InvalidCharacter {
            character,
            position,
        });
    }

    Ok(Vin::from_validated(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_scenario_valid_vin() {
        let vin = validate("1HGCM82633A004352").unwrap();
        assert_eq!(vin.as_str(), "1HGCM82633A004352");
    }

    #[test]
    fn test_scenario_short_code() {
        assert_eq!(
            validate("SHORTCODE"),
            Err(ValidationError::TooShort { length: 9 })
        );
    }

    #[rstest]
    #[case("")]
    #[case("1")]
    #[case("1HGCM82633A00435")]
    fn test_too_short(#[case] raw: &str) {
        assert!(matches!(validate(raw), Err(ValidationError::TooShort { .. })));
    }

    #[rstest]
    #[case("1HGCM82633A0043521")]
    #[case("1HGCM82633A004352 ")]
    #[case("1HGCM82633A0043521HGCM82633A004352")]
    fn test_too_long(#[case] raw: &str) {
        assert!(matches!(validate(raw), Err(ValidationError::TooLong { .. })));
    }

    #[rstest]
    #[case("IHGCM82633A004352", 'I', 0)]
    #[case("1HGCM82633A0O4352", 'O', 12)]
    #[case("1HGCM82633A00435Q", 'Q', 16)]
    #[case("1hgcm82633a004352", 'h', 1)]
    #[case("1HGCM8263-A004352", '-', 9)]
    fn test_invalid_character(#[case] raw: &str, #[case] character: char, #[case] position: usize) {
        assert_eq!(
            validate(raw),
            Err(ValidationError::InvalidCharacter { character, position })
        );
    }

    #[test]
    fn test_any_17_char_string_with_excluded_letter_is_rejected() {
        let base: Vec<char> = "1HGCM82633A004352".chars().collect();
        for excluded in ['I', 'O', 'Q'] {
            for position in 0..VIN_LENGTH {
                let mut chars = base.clone();
                chars[position] = excluded;
                let raw: String = chars.into_iter().collect();
                assert!(
                    matches!(validate(&raw), Err(ValidationError::InvalidCharacter { .. })),
                    "{} should be rejected",
                    raw
                );
            }
        }
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 17 characters, one of them multi-byte
        let raw = "1HGCM82633A00435É";
        assert_eq!(
            validate(raw),
            Err(ValidationError::InvalidCharacter { character: 'É', position: 16 })
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        for raw in ["1HGCM82633A004352", "5YJ3E1EA7KF317000", "WVWZZZ1JZXW000001"] {
            let first = validate(raw).unwrap();
            let second = validate(first.as_str()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_is_vin_char() {
        assert!(is_vin_char('A'));
        assert!(is_vin_char('9'));
        assert!(!is_vin_char('I'));
        assert!(!is_vin_char('O'));
        assert!(!is_vin_char('Q'));
        assert!(!is_vin_char('a'));
    }

    #[test]
    fn test_is_vin_char_matches_validate() {
        let candidates = (0u32..0x80)
            .filter_map(char::from_u32)
            .chain(['É', 'Ø', '\u{0130}', '１']);
        for c in candidates {
            let raw = format!("1HGCM82633A00435{}", c);
            assert_eq!(
                validate(&raw).is_ok(),
                is_vin_char(c),
                "validate and is_vin_char disagree on {:?}",
                c
            );
        }
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(ValidationError::TooShort { length: 1 }.kind(), "too_short");
        assert_eq!(ValidationError::TooLong { length: 18 }.kind(), "too_long");
        assert_eq!(
            validate("1HGCM82633A0O4352").unwrap_err().kind(),
            "invalid_character"
        );
    }
}
