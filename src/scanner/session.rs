//! Scan session state machine
//!
//! A single tokio task owns all session state. It takes frames from the [`FrameFeed`]
//! queue, commands from the [`SessionHandle`], and verification completions from the
//! tasks it spawns, one at a time. While a code is being checked, intake is paused and
//! the frame branch is disabled, so at most one verification is ever in flight.
//!
//! Status emissions per cycle are ordered as
//! `[InvalidFormat]` or `Checking -> {DuplicateVin | Found | NotFound | NetworkError} -> Ready`.
//! The closing `Ready` is stamped `Cooldown`; the session enters `CaptureActive` right after.

use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::frame::{CodeDecoder, Frame, FrameFeed, SymbolDecoder};
use super::validator;
use crate::ledger::Ledger;
use crate::models::{
    ScanCode, ScanStatus, SessionConfig, SessionState, StatusUpdate, VerificationResult, Vin,
};
use crate::verification::{VerificationClient, VerificationError};

/// Errors returned by [`SessionHandle`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Scan session has stopped")]
    Stopped,
    #[error("Scan session task failed: {message}")]
    TaskFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    CameraReady,
    CameraLost,
    Finish,
    Shutdown,
}

/// Updates buffered per subscriber before the oldest is dropped
pub const STATUS_BUFFER: usize = 64;

struct Completion {
    generation: u64,
    cycle: u64,
    vin: Vin,
    result: Result<VerificationResult, VerificationError>,
}

#[derive(Default)]
struct Subscribers {
    senders: Vec<async_channel::Sender<StatusUpdate>>,
    closed: bool,
}

/// Fans status updates out to every subscriber, in emission order
#[derive(Default)]
pub struct StatusBroadcaster {
    inner: Mutex<Subscribers>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it receives every update emitted after this call
    ///
    /// Each subscriber buffers at most [`STATUS_BUFFER`] updates. A subscriber that
    /// falls further behind loses its oldest updates, never the newest.
    /// Subscribing to a closed broadcaster yields an already-closed receiver.
    pub fn subscribe(&self) -> async_channel::Receiver<StatusUpdate> {
        let (tx, rx) = async_channel::bounded(STATUS_BUFFER);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.closed {
            inner.senders.push(tx);
        }
        rx
    }

    pub fn emit(&self, update: StatusUpdate) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // force_send only fails once the receiver is gone
        inner
            .senders
            .retain(|subscriber| match subscriber.force_send(update.clone()) {
                Ok(None) => true,
                Ok(Some(dropped)) => {
                    tracing::debug!(
                        "Status subscriber lagging, dropped {} update",
                        dropped.status.as_str()
                    );
                    true
                }
                Err(_) => false,
            });
    }

    /// Drop every subscriber so their receivers end
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.closed = true;
        inner.senders.clear();
    }
}

/// Builder for a scan session
pub struct ScanSession {
    config: SessionConfig,
    verifier: Arc<dyn VerificationClient>,
    ledger: Arc<dyn Ledger>,
    decoder: Arc<dyn CodeDecoder>,
}

impl ScanSession {
    pub fn new(
        config: SessionConfig,
        verifier: Arc<dyn VerificationClient>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            config,
            verifier,
            ledger,
            decoder: Arc::new(SymbolDecoder),
        }
    }

    /// Replace the default [`SymbolDecoder`]
    pub fn with_decoder(mut self, decoder: Arc<dyn CodeDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Spawn the session task in `Idle`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> SessionHandle {
        let (feed, frames) = FrameFeed::bounded(self.config.frame_queue_capacity);
        let (commands_tx, commands_rx) = async_channel::unbounded();
        let (completions_tx, completions_rx) = async_channel::unbounded();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let status = Arc::new(StatusBroadcaster::new());

        let actor = SessionActor {
            config: self.config,
            verifier: self.verifier,
            ledger: self.ledger,
            decoder: self.decoder,
            feed: feed.clone(),
            frames,
            completions_tx,
            status: status.clone(),
            state_tx,
            state: SessionState::Idle,
            generation: 0,
            cycle: 0,
            in_flight: None,
            last_code: None,
            finishing: false,
        };

        let task = tokio::spawn(actor.run(commands_rx, completions_rx));
        tracing::debug!("Scan session started");

        SessionHandle {
            commands: commands_tx,
            status,
            state: state_rx,
            feed,
            task,
        }
    }
}

/// Control surface of a running session
pub struct SessionHandle {
    commands: async_channel::Sender<SessionCommand>,
    status: Arc<StatusBroadcaster>,
    state: watch::Receiver<SessionState>,
    feed: FrameFeed,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// The camera is delivering frames: leave `Idle` and start accepting them
    pub fn camera_ready(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::CameraReady)
    }

    /// The camera went away: pause intake and return to `Idle`
    ///
    /// A verification still in flight is abandoned; its result will be discarded.
    /// Observers get a `CameraUnavailable` update stamped `Idle`.
    pub fn camera_lost(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::CameraLost)
    }

    pub fn subscribe(&self) -> async_channel::Receiver<StatusUpdate> {
        self.status.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Producer side for capture threads
    pub fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }

    /// Wait until the session reaches `target`
    pub async fn wait_for_state(&self, target: SessionState) -> Result<(), SessionError> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Stopped)
    }

    /// Stop intake, end the session task and wait for it
    ///
    /// Any in-flight verification keeps running but its result is dropped.
    pub async fn shutdown(self) -> Result<(), SessionError> {
        if self.commands.try_send(SessionCommand::Shutdown).is_err() {
            tracing::debug!("Shutdown requested for a session that already stopped");
        }
        self.join().await
    }

    /// Close intake, then stop once queued frames and the in-flight cycle are done
    ///
    /// Frames already queued are still decoded, and a running verification still
    /// reports its outcome and closing `Ready` before the status channel closes.
    pub async fn finish(self) -> Result<(), SessionError> {
        if self.commands.try_send(SessionCommand::Finish).is_err() {
            tracing::debug!("Finish requested for a session that already stopped");
        }
        self.join().await
    }

    async fn join(self) -> Result<(), SessionError> {
        // A closed command channel ends the task, so the sender outlives the wait
        let SessionHandle { commands, task, .. } = self;
        let joined = task.await;
        drop(commands);

        joined.map_err(|e| SessionError::TaskFailed {
            message: e.to_string(),
        })
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .try_send(command)
            .map_err(|_| SessionError::Stopped)
    }
}

struct SessionActor {
    config: SessionConfig,
    verifier: Arc<dyn VerificationClient>,
    ledger: Arc<dyn Ledger>,
    decoder: Arc<dyn CodeDecoder>,
    feed: FrameFeed,
    frames: async_channel::Receiver<Frame>,
    completions_tx: async_channel::Sender<Completion>,
    status: Arc<StatusBroadcaster>,
    state_tx: watch::Sender<SessionState>,
    state: SessionState,
    /// Bumped whenever an in-flight cycle is abandoned
    generation: u64,
    cycle: u64,
    in_flight: Option<u64>,
    /// Last code that finished a cycle or was rejected, for rescan suppression
    last_code: Option<(ScanCode, Instant)>,
    /// Intake stays closed; the task ends once pending work is done
    finishing: bool,
}

impl SessionActor {
    async fn run(
        mut self,
        commands: async_channel::Receiver<SessionCommand>,
        completions: async_channel::Receiver<Completion>,
    ) {
        let frames = self.frames.clone();
        let mut frames_open = true;

        loop {
            let accepting = self.state == SessionState::CaptureActive && frames_open;
            let queued = accepting && !frames.is_empty();
            if self.finishing && self.in_flight.is_none() && !queued {
                break;
            }

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Ok(SessionCommand::CameraReady) => self.on_camera_ready(),
                    Ok(SessionCommand::CameraLost) => self.on_camera_lost(),
                    Ok(SessionCommand::Finish) => self.on_finish(),
                    Ok(SessionCommand::Shutdown) | Err(_) => break,
                },
                Ok(completion) = completions.recv() => self.on_completion(completion),
                frame = frames.recv(), if accepting => match frame {
                    Ok(frame) => self.on_frame(frame),
                    Err(_) => frames_open = false,
                },
            }
        }

        self.stop();
    }

    fn on_camera_ready(&mut self) {
        if self.state != SessionState::Idle {
            tracing::debug!("Camera ready ignored in state {}", self.state.as_str());
            return;
        }

        self.drain_frames();
        self.resume_intake();
        self.set_state(SessionState::CaptureActive);
        self.emit(self.update(ScanStatus::Ready));
    }

    fn on_camera_lost(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }

        let abandoned = self.in_flight.take();
        if let Some(cycle) = abandoned {
            self.generation += 1;
            tracing::info!("Camera lost during cycle {}, abandoning verification", cycle);
        }
        self.feed.pause();
        self.drain_frames();
        self.set_state(SessionState::Idle);

        let mut update = self.update(ScanStatus::CameraUnavailable);
        if let Some(cycle) = abandoned {
            update = update.with_cycle(cycle);
        }
        self.emit(update);
    }

    fn on_finish(&mut self) {
        tracing::debug!("Finishing session in state {}", self.state.as_str());
        self.finishing = true;
        self.feed.pause();
    }

    fn on_frame(&mut self, frame: Frame) {
        let Some(code) = self.decoder.decode(&frame) else {
            return;
        };

        if self.is_rescan(&code) {
            tracing::debug!("Ignoring repeat of {:?} (frame {})", code, frame.sequence);
            return;
        }

        match validator::validate(&code) {
            Ok(vin) => self.begin_cycle(vin),
            Err(e) => {
                tracing::info!(kind = e.kind(), "Rejected code {:?}: {}", code, e);
                self.last_code = Some((code.clone(), Instant::now()));
                let update = self
                    .update(ScanStatus::InvalidFormat)
                    .with_detail(e.to_string())
                    .with_code(code);
                self.emit(update);
            }
        }
    }

    fn begin_cycle(&mut self, vin: Vin) {
        self.cycle += 1;
        let cycle = self.cycle;

        self.feed.pause();
        self.drain_frames();
        self.set_state(SessionState::Checking);
        self.emit(
            self.update(ScanStatus::Checking)
                .with_code(vin.as_str())
                .with_cycle(cycle),
        );

        match self.ledger.contains(&vin) {
            Ok(true) => {
                let first_scanned = match self.ledger.entry(&vin) {
                    Ok(entry) => entry.map(|entry| entry.scan_date),
                    Err(e) => {
                        tracing::warn!("Could not read ledger entry for {}: {}", vin, e);
                        None
                    }
                };
                tracing::info!("{} already scanned", vin);
                self.emit(
                    self.update(ScanStatus::DuplicateVin)
                        .with_code(vin.as_str())
                        .with_cycle(cycle)
                        .with_scan_date(first_scanned),
                );
                self.finish_cycle(vin.to_string(), cycle);
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Ledger lookup failed for {}, verifying anyway: {}", vin, e);
            }
        }

        self.in_flight = Some(cycle);
        let generation = self.generation;
        let verifier = self.verifier.clone();
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = verifier.verify(&vin).await;
            let completion = Completion {
                generation,
                cycle,
                vin,
                result,
            };
            if completions.send(completion).await.is_err() {
                tracing::debug!("Session gone, discarding verification result for cycle {}", cycle);
            }
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        if completion.generation != self.generation || self.in_flight != Some(completion.cycle) {
            tracing::debug!(
                "Dropping stale verification result (generation {}, cycle {})",
                completion.generation,
                completion.cycle
            );
            return;
        }
        self.in_flight = None;

        let Completion {
            cycle, vin, result, ..
        } = completion;

        let update = match result {
            Ok(result) => {
                let status = if result.found {
                    ScanStatus::Found
                } else {
                    ScanStatus::NotFound
                };
                tracing::info!("{} verified: {}", vin, status.as_str());

                let mut update = self
                    .update(status)
                    .with_code(vin.as_str())
                    .with_cycle(cycle)
                    .with_scan_date(result.scan_date);
                if let Some(description) = result.description {
                    update = update.with_detail(description);
                }

                if self.config.record_policy.should_record(result.found) {
                    if let Err(e) = self.ledger.record(&vin, Utc::now()) {
                        tracing::error!("Failed to record {} in ledger: {}", vin, e);
                        update = update.with_ledger_warning(e.to_string());
                    }
                }
                update
            }
            Err(e) => {
                tracing::warn!("Verification failed for {}: {}", vin, e);
                self.update(ScanStatus::NetworkError)
                    .with_code(vin.as_str())
                    .with_cycle(cycle)
                    .with_detail(e.to_string())
            }
        };

        self.emit(update);
        self.finish_cycle(vin.to_string(), cycle);
    }

    fn finish_cycle(&mut self, code: ScanCode, cycle: u64) {
        self.set_state(SessionState::Cooldown);
        self.last_code = Some((code, Instant::now()));

        self.drain_frames();
        self.resume_intake();
        // Ready closes the cycle while still in Cooldown
        self.emit(self.update(ScanStatus::Ready).with_cycle(cycle));
        self.set_state(SessionState::CaptureActive);
    }

    fn stop(&mut self) {
        if let Some(cycle) = self.in_flight.take() {
            tracing::debug!("Session stopping with cycle {} in flight", cycle);
        }
        self.feed.pause();
        self.frames.close();
        self.set_state(SessionState::Stopped);
        self.status.close();
        tracing::debug!("Scan session stopped");
    }

    fn is_rescan(&self, code: &str) -> bool {
        let cooldown = self.config.rescan_cooldown;
        if cooldown.is_zero() {
            return false;
        }
        matches!(&self.last_code, Some((last, at)) if last == code && at.elapsed() < cooldown)
    }

    fn resume_intake(&self) {
        if !self.finishing {
            self.feed.resume();
        }
    }

    /// Discard frames queued before intake was paused or resumed
    fn drain_frames(&self) {
        let mut dropped = 0usize;
        while self.frames.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("Discarded {} stale frame(s)", dropped);
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!("Session {} -> {}", self.state.as_str(), next.as_str());
        }
        self.state = next;
        self.state_tx.send_replace(next);
    }

    fn update(&self, status: ScanStatus) -> StatusUpdate {
        StatusUpdate::new(status, self.state, self.feed.is_paused())
    }

    fn emit(&self, update: StatusUpdate) {
        self.status.emit(update);
    }
}
