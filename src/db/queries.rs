use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{LedgerEntry, Vin};

// ===== VIN RECORDS =====

/// Insert a VIN unless it is already present
///
/// Returns true when a new row was written. An existing row keeps its original scan date.
pub fn insert_vin_record(conn: &Connection, vin: &Vin, scan_date: DateTime<Utc>) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO vin_records (vin_number, scan_date) VALUES (?, ?)",
            params![vin.as_str(), scan_date.to_rfc3339()],
        )
        .context("Failed to insert VIN record")?;

    Ok(inserted > 0)
}

pub fn vin_record_exists(conn: &Connection, vin: &Vin) -> Result<bool> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM vin_records WHERE vin_number = ?)",
            params![vin.as_str()],
            |row| row.get(0),
        )
        .context("Failed to query VIN record")?;

    Ok(exists)
}

pub fn select_vin_record(conn: &Connection, vin: &Vin) -> Result<Option<LedgerEntry>> {
    let mut stmt = conn
        .prepare("SELECT vin_number, scan_date FROM vin_records WHERE vin_number = ?")
        .context("Failed to prepare select VIN record query")?;

    let raw = stmt
        .query_row(params![vin.as_str()], read_raw_entry)
        .optional()
        .context("Failed to query VIN record")?;

    raw.map(into_entry).transpose()
}

/// Most recent records first
pub fn select_recent_vin_records(conn: &Connection, limit: usize) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT vin_number, scan_date FROM vin_records ORDER BY scan_date DESC, id DESC LIMIT ?",
        )
        .context("Failed to prepare select recent VIN records query")?;

    let rows = stmt
        .query_map(params![limit as i64], read_raw_entry)
        .context("Failed to map VIN records from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect VIN records")?;

    rows.into_iter().map(into_entry).collect()
}

pub fn count_vin_records(conn: &Connection) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM vin_records", [], |row| row.get(0))
        .context("Failed to count VIN records")?;

    Ok(count as usize)
}

fn read_raw_entry(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn into_entry((vin_number, scan_date): (String, String)) -> Result<LedgerEntry> {
    let vin = Vin::parse(&vin_number)
        .with_context(|| format!("Stored VIN is malformed: {}", vin_number))?;
    let scan_date = DateTime::parse_from_rfc3339(&scan_date)
        .with_context(|| format!("Stored scan date is malformed: {}", scan_date))?
        .with_timezone(&Utc);

    Ok(LedgerEntry::new(vin, scan_date))
}
