/*!
 * Progress events for per-worker upload monitoring
 *
 * Workers report through a `ProgressSink` instead of printing:
 * - `LogSink` narrates events through `tracing`
 * - `ProgressPublisher` forwards them over a channel to a subscriber
 * - `NullSink` drops them
 *
 * `DecileTracker` decides when a payload progress event is due.
 */

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Progress event types
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Handshake accepted, payload about to stream
    UploadStart {
        worker: usize,
        filename: String,
        total_bytes: u64,
        timestamp: u64,
    },

    /// Payload crossed a decile boundary or finished
    UploadProgress {
        worker: usize,
        bytes_sent: u64,
        total_bytes: u64,
        timestamp: u64,
    },

    /// Server acknowledged the full upload
    UploadComplete {
        worker: usize,
        bytes_sent: u64,
        duration_ms: u64,
        video_id: Option<String>,
        timestamp: u64,
    },

    /// Attempt failed at any stage
    UploadFailed {
        worker: usize,
        error: String,
        bytes_sent: u64,
        timestamp: u64,
    },
}

impl ProgressEvent {
    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    pub fn upload_start(worker: usize, filename: String, total_bytes: u64) -> Self {
        ProgressEvent::UploadStart {
            worker,
            filename,
            total_bytes,
            timestamp: Self::current_timestamp(),
        }
    }

    pub fn upload_progress(worker: usize, bytes_sent: u64, total_bytes: u64) -> Self {
        ProgressEvent::UploadProgress {
            worker,
            bytes_sent,
            total_bytes,
            timestamp: Self::current_timestamp(),
        }
    }

    pub fn upload_complete(
        worker: usize,
        bytes_sent: u64,
        duration_ms: u64,
        video_id: Option<String>,
    ) -> Self {
        ProgressEvent::UploadComplete {
            worker,
            bytes_sent,
            duration_ms,
            video_id,
            timestamp: Self::current_timestamp(),
        }
    }

    pub fn upload_failed(worker: usize, error: String, bytes_sent: u64) -> Self {
        ProgressEvent::UploadFailed {
            worker,
            error,
            bytes_sent,
            timestamp: Self::current_timestamp(),
        }
    }

    /// Index of the worker that produced this event
    pub fn worker(&self) -> usize {
        match self {
            ProgressEvent::UploadStart { worker, .. }
            | ProgressEvent::UploadProgress { worker, .. }
            | ProgressEvent::UploadComplete { worker, .. }
            | ProgressEvent::UploadFailed { worker, .. } => *worker,
        }
    }
}

/// Percentage of `total` covered by `sent`; an empty payload counts as done
pub fn percent_complete(sent: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        sent as f64 * 100.0 / total as f64
    }
}

/// Receiver of worker progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that narrates events as log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::UploadStart {
                worker,
                filename,
                total_bytes,
                ..
            } => {
                info!(worker, %filename, total_bytes, "Streaming payload");
            }
            ProgressEvent::UploadProgress {
                worker,
                bytes_sent,
                total_bytes,
                ..
            } => {
                info!(
                    worker,
                    "Progress: {}/{} bytes ({:.1}%)",
                    bytes_sent,
                    total_bytes,
                    percent_complete(bytes_sent, total_bytes)
                );
            }
            ProgressEvent::UploadComplete {
                worker,
                duration_ms,
                video_id,
                ..
            } => {
                info!(
                    worker,
                    video_id = video_id.as_deref().unwrap_or("-"),
                    "Upload took {:.2} seconds",
                    duration_ms as f64 / 1000.0
                );
            }
            ProgressEvent::UploadFailed {
                worker,
                error,
                bytes_sent,
                ..
            } => {
                warn!(worker, bytes_sent, "Upload failed: {}", error);
            }
        }
    }
}

/// Progress publisher - sends events to a subscriber
#[derive(Clone)]
pub struct ProgressPublisher {
    sender: Option<Sender<ProgressEvent>>,
}

impl ProgressPublisher {
    /// Create a new publisher with bounded channel
    pub fn new(buffer_size: usize) -> (Self, ProgressSubscriber) {
        let (tx, rx) = bounded(buffer_size);
        (
            ProgressPublisher { sender: Some(tx) },
            ProgressSubscriber { receiver: rx },
        )
    }

    /// Create a new publisher with unbounded channel
    pub fn unbounded() -> (Self, ProgressSubscriber) {
        let (tx, rx) = unbounded();
        (
            ProgressPublisher { sender: Some(tx) },
            ProgressSubscriber { receiver: rx },
        )
    }

    /// Create a no-op publisher (for when progress tracking is disabled)
    pub fn noop() -> Self {
        ProgressPublisher { sender: None }
    }

    /// Publish an event
    pub fn publish(&self, event: ProgressEvent) {
        if let Some(ref tx) = self.sender {
            let _ = tx.send(event); // Ignore send errors (subscriber may have dropped)
        }
    }
}

impl ProgressSink for ProgressPublisher {
    fn emit(&self, event: ProgressEvent) {
        self.publish(event);
    }
}

/// Progress subscriber - receives events
pub struct ProgressSubscriber {
    receiver: Receiver<ProgressEvent>,
}

impl ProgressSubscriber {
    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything published so far
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Decides when a payload progress event is due
///
/// Fires once per newly crossed tenth of `total` and once when the payload
/// is complete. Payloads under ten bytes only fire on completion; empty
/// payloads never fire.
#[derive(Debug, Clone)]
pub struct DecileTracker {
    total: u64,
    step: u64,
    last_decile: u64,
    finished: bool,
}

impl DecileTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            step: total / 10,
            last_decile: 0,
            finished: false,
        }
    }

    /// Record the cumulative byte count; true when an event should be emitted
    pub fn observe(&mut self, sent: u64) -> bool {
        if self.total == 0 || self.finished {
            return false;
        }
        if sent >= self.total {
            self.finished = true;
            return true;
        }
        if self.step == 0 {
            return false;
        }
        let decile = sent / self.step;
        if decile > self.last_decile {
            self.last_decile = decile;
            return true;
        }
        false
    }
}
