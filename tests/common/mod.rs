//! Common test helpers for integration tests
//!
//! Isolated ledger databases, scriptable verification clients and helpers for
//! driving a scan session and reading its status stream.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use vinscan::ledger::{Ledger, LedgerError, SqliteLedger};
use vinscan::models::{LedgerEntry, StatusUpdate, VerificationResult, Vin};
use vinscan::scanner::{FrameFeed, FrameSubmit};
use vinscan::verification::{VerificationClient, VerificationError};

pub const ACCORD_VIN: &str = "1HGCM82633A004352";
pub const MODEL3_VIN: &str = "5YJ3E1EA7KF317000";

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Ledger database in its own temporary directory
///
/// The directory (and database) is removed when the value is dropped.
pub struct TestLedgerDir {
    temp_dir: TempDir,
}

impl TestLedgerDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join(vinscan::db::DB_FILE_NAME)
    }

    /// Open (or reopen) the ledger stored in this directory
    pub fn open(&self) -> Result<Arc<SqliteLedger>> {
        Ok(Arc::new(SqliteLedger::open(self.data_dir())?))
    }

    /// Raw connection for inspecting what was written
    pub fn connection(&self) -> Result<Connection> {
        Ok(Connection::open(self.db_path())?)
    }

    pub fn count_rows(&self) -> Result<i64> {
        let count = self
            .connection()?
            .query_row("SELECT COUNT(*) FROM vin_records", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_schema_version(&self) -> Result<i64> {
        let version = self
            .connection()?
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists = self.connection()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
            rusqlite::params![table_name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

type Responder = Box<dyn Fn(&Vin) -> Result<VerificationResult, VerificationError> + Send + Sync>;

/// Scriptable [`VerificationClient`] that counts calls and can hold responses back
pub struct FakeVerifier {
    responder: Responder,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeVerifier {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Vin) -> Result<VerificationResult, VerificationError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn found(description: &str) -> Self {
        let description = description.to_string();
        Self::new(move |_| Ok(VerificationResult::found(Some(description.clone()), None)))
    }

    pub fn not_found() -> Self {
        Self::new(|_| Ok(VerificationResult::not_found()))
    }

    pub fn failing(error: VerificationError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Hold every response until [`FakeVerifier::release`] is called
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, responses: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(responses);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationClient for FakeVerifier {
    async fn verify(&self, vin: &Vin) -> Result<VerificationResult, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("verifier gate closed")
                .forget();
        }
        (self.responder)(vin)
    }
}

/// Ledger whose reads or writes can be made to fail
#[derive(Default)]
pub struct FlakyLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl FlakyLedger {
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }
}

impl Ledger for FlakyLedger {
    fn contains(&self, vin: &Vin) -> Result<bool, LedgerError> {
        if self.fail_reads {
            return Err(LedgerError::Read {
                message: "disk I/O error".to_string(),
            });
        }
        Ok(self.entries.lock().unwrap().iter().any(|e| &e.vin == vin))
    }

    fn record(&self, vin: &Vin, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.fail_writes {
            return Err(LedgerError::Persistence {
                message: "database is locked".to_string(),
            });
        }
        if !self.contains(vin)? {
            self.entries
                .lock()
                .unwrap()
                .push(LedgerEntry::new(vin.clone(), at));
        }
        Ok(())
    }

    fn entry(&self, vin: &Vin) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.vin == vin)
            .cloned())
    }

    fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.entries.lock().unwrap().len())
    }
}

/// Next status update, failing the test if none arrives in time
pub async fn next_update(rx: &async_channel::Receiver<StatusUpdate>) -> StatusUpdate {
    tokio::time::timeout(STATUS_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a status update")
        .expect("status channel closed")
}

/// Updates up to and including the next `Ready`
///
/// Fails the test unless exactly one cycle outcome arrives, right before `Ready`.
pub async fn collect_cycle(rx: &async_channel::Receiver<StatusUpdate>) -> Vec<StatusUpdate> {
    let mut updates = Vec::new();
    loop {
        let update = next_update(rx).await;
        let done = update.status == vinscan::ScanStatus::Ready;
        updates.push(update);
        if done {
            break;
        }
    }

    let outcomes: Vec<usize> = updates
        .iter()
        .enumerate()
        .filter(|(_, u)| u.status.is_cycle_outcome())
        .map(|(i, _)| i + 2)
        .collect();
    assert_eq!(
        outcomes,
        vec![updates.len()],
        "expected one outcome right before Ready, got {:?}",
        updates.iter().map(|u| u.status).collect::<Vec<_>>()
    );
    updates
}

/// Submit a one-symbol frame, retrying while the single-slot queue is occupied
pub async fn submit_code(feed: &FrameFeed, code: &str) {
    for _ in 0..400 {
        match feed.submit_symbols([code]) {
            FrameSubmit::Queued => return,
            FrameSubmit::Closed => panic!("frame feed closed"),
            FrameSubmit::Paused | FrameSubmit::QueueFull => {
                tokio::time::sleep(Duration::from_millis(5)).await
            }
        }
    }
    panic!("frame for {:?} was never accepted", code);
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_stub_service(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub service");
    });

    format!("http://{}", addr)
}
