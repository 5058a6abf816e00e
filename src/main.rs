//! vinscan console harness
//!
//! Headless stand-in for the camera screen. Each line read from stdin is treated as the
//! barcode payload of one captured frame; every status update is printed to stdout.
//! EOF (Ctrl-D) closes intake; the session stops once a check already under way
//! has reported its result.
//!
//! Usage: API_URL=https://... API_KEY=... vinscan

use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::Arc;

use vinscan::models::{ScanStatus, ScannerConfig, SessionState, StatusUpdate};
use vinscan::scanner::{FrameFeed, FrameSubmit, ScanSession};
use vinscan::utils::{init_logging, load_env};
use vinscan::verification::HttpVerificationClient;

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_logging();

    let config = ScannerConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        "Using verification service {} (ledger: {}, record policy: {})",
        config.verification.endpoint,
        config.ledger_scope.as_str(),
        config.session.record_policy.as_str()
    );

    let client = HttpVerificationClient::new(&config.verification)
        .context("Failed to create verification client")?;

    match client.health().await {
        Ok(health) if health.healthy => tracing::info!("Verification service is healthy"),
        Ok(health) => tracing::warn!(
            "Verification service reports unhealthy: {}",
            health.message.unwrap_or_else(|| "no details".to_string())
        ),
        Err(e) => tracing::warn!("Verification service health check failed: {}", e),
    }

    let ledger = vinscan::ledger::open_ledger(config.ledger_scope, &config.data_dir)
        .with_context(|| format!("Failed to open ledger in {:?}", config.data_dir))?;

    let session = ScanSession::new(config.session.clone(), Arc::new(client), ledger).start();
    let updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            print_update(&update);
        }
    });

    session.camera_ready()?;
    session.wait_for_state(SessionState::CaptureActive).await?;

    let capture = spawn_capture_thread(session.feed());
    // Capture thread ends on stdin EOF
    tokio::task::spawn_blocking(move || capture.join())
        .await
        .context("Capture thread join task failed")?
        .map_err(|_| anyhow::anyhow!("Capture thread panicked"))?;

    session.finish().await?;
    printer.await.context("Status printer task failed")?;

    Ok(())
}

fn spawn_capture_thread(feed: FrameFeed) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to read from stdin: {}", e);
                    break;
                }
            };

            match feed.submit_symbols([line]) {
                FrameSubmit::Queued => {}
                FrameSubmit::Paused => tracing::debug!("Frame dropped, capture paused"),
                FrameSubmit::QueueFull => tracing::debug!("Frame dropped, queue full"),
                FrameSubmit::Closed => break,
            }
        }
    })
}

fn print_update(update: &StatusUpdate) {
    let marker = if update.is_success() { "+" } else { " " };
    let mut line = format!("{}[{}] {}", marker, update.status.as_str(), update.message());

    match update.status {
        ScanStatus::InvalidFormat | ScanStatus::NetworkError => {
            if let Some(detail) = &update.detail {
                line.push_str(&format!(" ({})", detail));
            }
        }
        _ => {}
    }
    if let Some(code) = &update.code {
        line.push_str(&format!(" | {}", code));
    }
    if let Some(scan_date) = update.scan_date {
        line.push_str(&format!(" | scanned {}", scan_date.to_rfc3339()));
    }
    if let Some(warning) = &update.ledger_warning {
        line.push_str(&format!(" | ledger: {}", warning));
    }

    println!("{}", line);
}
