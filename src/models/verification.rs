use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single remote lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub found: bool,
    pub description: Option<String>,
    pub scan_date: Option<DateTime<Utc>>,
}

impl VerificationResult {
    pub fn found(description: Option<String>, scan_date: Option<DateTime<Utc>>) -> Self {
        Self {
            found: true,
            description,
            scan_date,
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            description: None,
            scan_date: None,
        }
    }
}

/// Wire format of `GET /api/check_vin`
///
/// The service omits `description` and `scan_date` entirely when the VIN is unknown.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckVinResponse {
    pub found: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scan_date: Option<String>,
}

impl CheckVinResponse {
    pub fn into_result(self) -> VerificationResult {
        let scan_date = self.scan_date.as_deref().and_then(|raw| {
            let parsed = parse_service_date(raw);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable scan_date from service: {:?}", raw);
            }
            parsed
        });

        VerificationResult {
            found: self.found,
            description: self.description,
            scan_date,
        }
    }
}

/// Parse the date formats the verification service is known to emit
///
/// Accepts RFC 3339, RFC 2822 / HTTP-date (`Tue, 15 Oct 2024 10:00:00 GMT`) and the
/// SQLite `CURRENT_TIMESTAMP` layout, which carries no offset and is read as UTC.
pub fn parse_service_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // RFC 2822 parsing in chrono rejects the "GMT" zone name on some inputs
    if let Some(stripped) = raw.strip_suffix(" GMT") {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%a, %d %b %Y %H:%M:%S") {
            return Some(naive.and_utc());
        }
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
