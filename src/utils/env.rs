//! Environment variable management
//!
//! Handles loading and validation of environment variables for the service
//! endpoint, API key and local storage location.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::ConfigError;

/// Load environment variables from .env file
///
/// Uses dotenv crate to load variables from .env file in the working directory.
/// Does not fail if .env file doesn't exist (optional configuration).
pub fn load_env() {
    dotenv::dotenv().ok();
}

/// Read a variable, treating empty values as unset
pub fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a numeric variable, falling back to `default` when unset
pub fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            message: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

/// Get API_URL (verification service base URL) from environment
pub fn get_api_url() -> Result<String, ConfigError> {
    let url = optional_var("API_URL").ok_or(ConfigError::Missing { name: "API_URL" })?;

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            name: "API_URL",
            message: format!("expected an http(s) URL, got '{}'", url),
        });
    }

    Ok(url)
}

/// Get API_KEY from environment
pub fn get_api_key() -> Result<String, ConfigError> {
    optional_var("API_KEY").ok_or(ConfigError::Missing { name: "API_KEY" })
}

/// Validate API key format
///
/// The key travels in an HTTP header, so it must be non-empty and contain
/// no whitespace or control characters.
pub fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::Invalid {
            name: "API_KEY",
            message: "API key cannot be empty".to_string(),
        });
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::Invalid {
            name: "API_KEY",
            message: "API key contains whitespace or control characters".to_string(),
        });
    }
    Ok(())
}

/// Get and validate API_KEY
pub fn get_and_validate_api_key() -> Result<String, ConfigError> {
    let key = get_api_key()?;
    validate_api_key(&key)?;
    Ok(key)
}

/// Directory used when VINSCAN_DATA_DIR is not set
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("vinscan"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Ledger data directory, honouring VINSCAN_DATA_DIR
pub fn data_dir() -> PathBuf {
    optional_var("VINSCAN_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_validate_api_key_valid() {
        assert!(validate_api_key("5fe6a87f63ababfcb50fc3e15ed9cbbf").is_ok());
    }

    #[test]
    fn test_validate_api_key_empty() {
        let result = validate_api_key("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_api_key_whitespace() {
        assert!(validate_api_key("abc def").is_err());
        assert!(validate_api_key("abc\ndef").is_err());
    }

    #[test]
    #[serial]
    fn test_optional_var_ignores_blank() {
        std::env::set_var("VINSCAN_TEST_BLANK", "   ");
        assert_eq!(optional_var("VINSCAN_TEST_BLANK"), None);
        std::env::set_var("VINSCAN_TEST_BLANK", " value ");
        assert_eq!(optional_var("VINSCAN_TEST_BLANK").as_deref(), Some("value"));
        std::env::remove_var("VINSCAN_TEST_BLANK");
    }

    #[test]
    #[serial]
    fn test_get_api_url_requires_scheme() {
        std::env::set_var("API_URL", "vehicledb.example.com");
        assert!(matches!(get_api_url(), Err(ConfigError::Invalid { .. })));

        std::env::set_var("API_URL", "https://vehicledb.example.com");
        assert_eq!(get_api_url().unwrap(), "https://vehicledb.example.com");
        std::env::remove_var("API_URL");
    }

    #[test]
    #[serial]
    fn test_data_dir_override() {
        std::env::set_var("VINSCAN_DATA_DIR", "/tmp/vinscan-data");
        assert_eq!(data_dir(), PathBuf::from("/tmp/vinscan-data"));
        std::env::remove_var("VINSCAN_DATA_DIR");
        assert_eq!(data_dir(), default_data_dir());
    }

    #[test]
    fn test_load_env_doesnt_fail_on_missing_file() {
        load_env();
    }
}
