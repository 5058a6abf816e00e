//! Test database isolation helpers

use rusqlite::Connection;

/// Owns a temporary directory holding one isolated ledger database
pub struct TestDbGuard {
    pub temp_dir: tempfile::TempDir,
}

impl TestDbGuard {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().unwrap();
        TestDbGuard { temp_dir }
    }

    /// Open (or reopen) the guarded database with the schema applied
    pub fn init_db(&self) -> anyhow::Result<Connection> {
        super::init_db(self.temp_dir.path())
    }
}

impl Default for TestDbGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_isolation() {
        let guard1 = TestDbGuard::new();
        let conn1 = guard1.init_db().expect("Failed to initialize database");
        conn1
            .execute(
                "INSERT INTO vin_records (vin_number, scan_date) VALUES (?, ?)",
                ["1HGCM82633A004352", "2024-10-15T10:00:00+00:00"],
            )
            .unwrap();

        let guard2 = TestDbGuard::new();
        let conn2 = guard2.init_db().expect("Failed to initialize database");
        let count: i64 = conn2
            .query_row("SELECT COUNT(*) FROM vin_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
