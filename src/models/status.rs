use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// States of the scan session state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "capture_active")]
    CaptureActive,
    #[serde(rename = "checking")]
    Checking,
    #[serde(rename = "cooldown")]
    Cooldown,
    #[serde(rename = "stopped")]
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::CaptureActive => "capture_active",
            SessionState::Checking => "checking",
            SessionState::Cooldown => "cooldown",
            SessionState::Stopped => "stopped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SessionState::Idle),
            "capture_active" => Some(SessionState::CaptureActive),
            "checking" => Some(SessionState::Checking),
            "cooldown" => Some(SessionState::Cooldown),
            "stopped" => Some(SessionState::Stopped),
            _ => None,
        }
    }
}

/// Status values surfaced to the presentation shell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "invalid_format")]
    InvalidFormat,
    #[serde(rename = "checking")]
    Checking,
    #[serde(rename = "duplicate_vin")]
    DuplicateVin,
    #[serde(rename = "found")]
    Found,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "network_error")]
    NetworkError,
    #[serde(rename = "camera_unavailable")]
    CameraUnavailable,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Ready => "ready",
            ScanStatus::InvalidFormat => "invalid_format",
            ScanStatus::Checking => "checking",
            ScanStatus::DuplicateVin => "duplicate_vin",
            ScanStatus::Found => "found",
            ScanStatus::NotFound => "not_found",
            ScanStatus::NetworkError => "network_error",
            ScanStatus::CameraUnavailable => "camera_unavailable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ready" => Some(ScanStatus::Ready),
            "invalid_format" => Some(ScanStatus::InvalidFormat),
            "checking" => Some(ScanStatus::Checking),
            "duplicate_vin" => Some(ScanStatus::DuplicateVin),
            "found" => Some(ScanStatus::Found),
            "not_found" => Some(ScanStatus::NotFound),
            "network_error" => Some(ScanStatus::NetworkError),
            "camera_unavailable" => Some(ScanStatus::CameraUnavailable),
            _ => None,
        }
    }

    /// True for the statuses that close a checking cycle
    pub fn is_cycle_outcome(&self) -> bool {
        matches!(
            self,
            ScanStatus::DuplicateVin
                | ScanStatus::Found
                | ScanStatus::NotFound
                | ScanStatus::NetworkError
        )
    }
}

/// One status emission from a scan session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ScanStatus,
    /// Human-readable detail: rejection reason, record description or error text
    pub detail: Option<String>,
    /// The code this update is about, if any
    pub code: Option<String>,
    pub scan_date: Option<DateTime<Utc>>,
    /// Whether frame intake is paused (drives the loading indicator)
    pub capture_paused: bool,
    pub state: SessionState,
    /// Checking cycle this update belongs to; `None` outside a cycle
    pub cycle: Option<u64>,
    /// Set when the result could not be written to the local ledger
    pub ledger_warning: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(status: ScanStatus, state: SessionState, capture_paused: bool) -> Self {
        Self {
            status,
            detail: None,
            code: None,
            scan_date: None,
            capture_paused,
            state,
            cycle: None,
            ledger_warning: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_scan_date(mut self, scan_date: Option<DateTime<Utc>>) -> Self {
        self.scan_date = scan_date;
        self
    }

    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn with_ledger_warning(mut self, warning: impl Into<String>) -> Self {
        self.ledger_warning = Some(warning.into());
        self
    }

    /// Operator-facing status line
    pub fn message(&self) -> String {
        match self.status {
            ScanStatus::Ready => "Ready to scan".to_string(),
            ScanStatus::InvalidFormat => "Invalid VIN format".to_string(),
            ScanStatus::Checking => "Checking VIN...".to_string(),
            ScanStatus::DuplicateVin => "VIN already scanned".to_string(),
            ScanStatus::Found => match self.detail.as_deref() {
                Some(description) if !description.is_empty() => {
                    format!("VIN found: {}", description)
                }
                _ => "VIN found".to_string(),
            },
            ScanStatus::NotFound => "VIN not found".to_string(),
            ScanStatus::NetworkError => "Error checking VIN".to_string(),
            ScanStatus::CameraUnavailable => "Camera unavailable".to_string(),
        }
    }

    /// Whether the shell should present this update as a success
    pub fn is_success(&self) -> bool {
        self.status == ScanStatus::Found
    }
}
