//! Frame intake
//!
//! Capture threads push frames through a [`FrameFeed`] into a small bounded queue that the
//! scan session drains. The feed never blocks: when the session is busy or the queue is
//! full, the frame is simply dropped, which is what a live camera wants.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::ScanCode;

/// One unit of camera output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    /// Raw image bytes, when the platform hands them over
    pub image: Option<Vec<u8>>,
    /// Symbol payloads the platform barcode detector found in this frame, in detection order
    pub symbols: Vec<String>,
}

impl Frame {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            image: None,
            symbols: Vec::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbols.push(symbol.into());
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Turns a frame into at most one scan code
pub trait CodeDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Option<ScanCode>;
}

/// First-barcode-wins decoder over detector symbols
///
/// Returns the first symbol that is not blank, trimmed of surrounding whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolDecoder;

impl CodeDecoder for SymbolDecoder {
    fn decode(&self, frame: &Frame) -> Option<ScanCode> {
        frame
            .symbols
            .iter()
            .map(|symbol| symbol.trim())
            .find(|symbol| !symbol.is_empty())
            .map(str::to_string)
    }
}

/// What happened to a submitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSubmit {
    Queued,
    /// Intake is paused (session idle or checking)
    Paused,
    /// The queue already holds as many frames as it can
    QueueFull,
    /// The session has stopped
    Closed,
}

/// Cloneable producer side of a session's frame queue
#[derive(Debug, Clone)]
pub struct FrameFeed {
    tx: async_channel::Sender<Frame>,
    paused: Arc<AtomicBool>,
    next_sequence: Arc<AtomicU64>,
}

impl FrameFeed {
    /// Create a paused feed and the matching receiver
    pub(crate) fn bounded(capacity: usize) -> (Self, async_channel::Receiver<Frame>) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        let feed = Self {
            tx,
            paused: Arc::new(AtomicBool::new(true)),
            next_sequence: Arc::new(AtomicU64::new(0)),
        };
        (feed, rx)
    }

    /// Offer a frame without blocking
    pub fn submit(&self, frame: Frame) -> FrameSubmit {
        if self.tx.is_closed() {
            return FrameSubmit::Closed;
        }
        if self.is_paused() {
            return FrameSubmit::Paused;
        }

        match self.tx.try_send(frame) {
            Ok(()) => FrameSubmit::Queued,
            Err(async_channel::TrySendError::Full(_)) => FrameSubmit::QueueFull,
            Err(async_channel::TrySendError::Closed(_)) => FrameSubmit::Closed,
        }
    }

    /// Build a frame carrying detector symbols and submit it
    pub fn submit_symbols<I, S>(&self, symbols: I) -> FrameSubmit
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frame = Frame::new(self.next_sequence.fetch_add(1, Ordering::Relaxed));
        frame.symbols = symbols.into_iter().map(Into::into).collect();
        self.submit(frame)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub(crate) fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }
}
