use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::env;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RESCAN_COOLDOWN: Duration = Duration::from_millis(2000);
pub const DEFAULT_FRAME_QUEUE: usize = 1;

/// Where duplicate suppression state lives
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    /// SQLite-backed, survives restarts
    #[serde(rename = "persistent")]
    Persistent,
    /// In-memory, reset every time a session starts
    #[serde(rename = "session")]
    Session,
}

impl LedgerScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerScope::Persistent => "persistent",
            LedgerScope::Session => "session",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "persistent" => Some(LedgerScope::Persistent),
            "session" => Some(LedgerScope::Session),
            _ => None,
        }
    }
}

/// Which verification outcomes are written to the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordPolicy {
    #[serde(rename = "found_only")]
    FoundOnly,
    #[serde(rename = "all_verified")]
    AllVerified,
}

impl RecordPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordPolicy::FoundOnly => "found_only",
            RecordPolicy::AllVerified => "all_verified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "found_only" => Some(RecordPolicy::FoundOnly),
            "all_verified" => Some(RecordPolicy::AllVerified),
            _ => None,
        }
    }

    pub fn should_record(&self, found: bool) -> bool {
        match self {
            RecordPolicy::FoundOnly => found,
            RecordPolicy::AllVerified => true,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} environment variable not set. Please set it in .env or your environment.")]
    Missing { name: &'static str },
    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Connection settings for the remote verification service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl VerificationConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Session behaviour knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub record_policy: RecordPolicy,
    /// Same code decoded again within this window is ignored
    pub rescan_cooldown: Duration,
    pub frame_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            record_policy: RecordPolicy::FoundOnly,
            rescan_cooldown: DEFAULT_RESCAN_COOLDOWN,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE,
        }
    }
}

/// Complete process configuration, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    pub verification: VerificationConfig,
    pub session: SessionConfig,
    pub ledger_scope: LedgerScope,
    pub data_dir: PathBuf,
}

impl ScannerConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            verification: VerificationConfig::new(endpoint, api_key),
            session: SessionConfig::default(),
            ledger_scope: LedgerScope::Persistent,
            data_dir: env::default_data_dir(),
        }
    }

    /// Build configuration from the process environment (after `load_env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::get_api_url()?;
        let api_key = env::get_and_validate_api_key()?;

        let request_timeout = Duration::from_secs(env::parse_var(
            "VINSCAN_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        )?);
        let rescan_cooldown = Duration::from_millis(env::parse_var(
            "VINSCAN_RESCAN_COOLDOWN_MS",
            DEFAULT_RESCAN_COOLDOWN.as_millis() as u64,
        )?);
        let frame_queue_capacity: usize = env::parse_var("VINSCAN_FRAME_QUEUE", DEFAULT_FRAME_QUEUE)?;
        if frame_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "VINSCAN_FRAME_QUEUE",
                message: "must be at least 1".to_string(),
            });
        }

        let ledger_scope = match env::optional_var("VINSCAN_LEDGER_SCOPE") {
            Some(value) => LedgerScope::from_str(&value).ok_or_else(|| ConfigError::Invalid {
                name: "VINSCAN_LEDGER_SCOPE",
                message: format!("expected 'persistent' or 'session', got '{}'", value),
            })?,
            None => LedgerScope::Persistent,
        };

        let record_policy = match env::optional_var("VINSCAN_RECORD_POLICY") {
            Some(value) => RecordPolicy::from_str(&value).ok_or_else(|| ConfigError::Invalid {
                name: "VINSCAN_RECORD_POLICY",
                message: format!("expected 'found_only' or 'all_verified', got '{}'", value),
            })?,
            None => RecordPolicy::FoundOnly,
        };

        Ok(Self {
            verification: VerificationConfig {
                endpoint,
                api_key,
                request_timeout,
            },
            session: SessionConfig {
                record_policy,
                rescan_cooldown,
                frame_queue_capacity,
            },
            ledger_scope,
            data_dir: env::data_dir(),
        })
    }
}
