//! Post-acceptance modification scoring
//!
//! Every accepted suggestion is queued here with its span. A periodic sweep
//! (default: every minute) retires entries older than the retention
//! threshold (default: 5 minutes), re-reads the span's current text, and
//! emits one [`ModificationEvent`] scoring how much the user edited the
//! insertion, as `min(1.0, distance / original_length)`.
//!
//! The queue is bounded (default capacity 10 000); on overflow the oldest
//! entry is evicted. This is best-effort telemetry: data loss under
//! overflow is acceptable and the accept path never blocks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::distance::levenshtein;
use crate::document::{AcceptedSpan, DocumentSource};
use crate::events::{ModificationEvent, TelemetrySettings, TelemetrySink};

/// Sweep cadence.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
/// Age at which an accepted suggestion is retired and scored.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);
/// Bounded queue capacity; overflow evicts the oldest entry.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10_000;

/// One accepted suggestion awaiting its modification score.
#[derive(Debug, Clone)]
pub struct AcceptedSuggestionEntry {
    pub accepted_at: Instant,
    pub span: AcceptedSpan,
    pub session_id: String,
    pub request_id: String,
    pub language: String,
}

impl AcceptedSuggestionEntry {
    pub fn new(
        span: AcceptedSpan,
        session_id: impl Into<String>,
        request_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            accepted_at: Instant::now(),
            span,
            session_id: session_id.into(),
            request_id: request_id.into(),
            language: language.into(),
        }
    }
}

/// Tracks accepted suggestions and emits a per-acceptance modification
/// percentage when each is retired.
pub struct ModificationTracker {
    queue: Mutex<VecDeque<AcceptedSuggestionEntry>>,
    capacity: usize,
    retention: Duration,
    source: Arc<dyn DocumentSource>,
    sink: Arc<dyn TelemetrySink>,
    settings: Arc<dyn TelemetrySettings>,
    shutdown_tx: broadcast::Sender<()>,
    is_shutting_down: AtomicBool,
}

impl ModificationTracker {
    /// Starts a tracker with the default cadence, retention, and capacity.
    pub fn start(
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn TelemetrySink>,
        settings: Arc<dyn TelemetrySettings>,
    ) -> Arc<Self> {
        Self::start_with(
            source,
            sink,
            settings,
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_RETENTION,
            DEFAULT_MAX_QUEUE_SIZE,
        )
    }

    pub fn start_with(
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn TelemetrySink>,
        settings: Arc<dyn TelemetrySettings>,
        check_interval: Duration,
        retention: Duration,
        capacity: usize,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let tracker = Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
            retention,
            source,
            sink,
            settings,
            shutdown_tx,
            is_shutting_down: AtomicBool::new(false),
        });
        Self::spawn_sweep_timer(tracker.clone(), check_interval);
        tracker
    }

    fn spawn_sweep_timer(tracker: Arc<Self>, check_interval: Duration) {
        let mut shutdown_rx = tracker.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(check_interval) => {
                        // a panicking sink must not kill the timer; the next
                        // sweep is always scheduled
                        let flush = std::panic::catch_unwind(
                            std::panic::AssertUnwindSafe(|| tracker.flush()),
                        );
                        if flush.is_err() {
                            warn!("modification sweep panicked");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("modification sweep timer cancelled");
                        break;
                    }
                }
            }
        });
    }

    /// Queues an accepted suggestion for later scoring. No-op while
    /// telemetry is disabled; never blocks beyond the queue lock.
    pub fn enqueue(&self, entry: AcceptedSuggestionEntry) {
        if !self.settings.is_telemetry_enabled() {
            return;
        }
        let mut queue = self.queue.lock();
        if queue.len() == self.capacity {
            let evicted = queue.pop_front();
            debug!(
                request_id = evicted.map(|e| e.request_id).as_deref(),
                "modification queue full; evicting oldest entry"
            );
        }
        queue.push_back(entry);
    }

    /// Retires and scores every entry older than the retention threshold.
    /// Called by the sweep timer and once more on disposal.
    pub fn flush(&self) {
        if !self.settings.is_telemetry_enabled() {
            self.queue.lock().clear();
            return;
        }
        let now = Instant::now();
        let retired: Vec<AcceptedSuggestionEntry> = {
            let mut queue = self.queue.lock();
            let mut kept = VecDeque::with_capacity(queue.len());
            let mut retired = Vec::new();
            for entry in queue.drain(..) {
                if now.duration_since(entry.accepted_at) > self.retention {
                    retired.push(entry);
                } else {
                    kept.push_back(entry);
                }
            }
            *queue = kept;
            retired
        };
        // Emit outside the lock so a slow sink cannot stall the accept path.
        for entry in retired {
            self.emit(entry);
        }
    }

    /// Cancels the sweep timer and performs one final best-effort flush.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.is_shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        self.flush();
    }

    pub fn queued_count(&self) -> usize {
        self.queue.lock().len()
    }

    fn emit(&self, entry: AcceptedSuggestionEntry) {
        let event = match self.source.span_text(&entry.span) {
            // Document closed or range invalidated: report fully modified
            // rather than failing.
            None => ModificationEvent {
                session_id: entry.session_id,
                request_id: entry.request_id,
                language: entry.language,
                modification_percentage: 1.0,
                original_char_count: 0,
                modified_char_count: 0,
            },
            Some(current) => {
                let original = entry.span.original_text.trim();
                let modified = current.trim();
                let (percentage, original_chars, modified_chars) =
                    if original.is_empty() || modified.is_empty() {
                        (1.0, 0, 0)
                    } else {
                        let original_len = original.chars().count();
                        let distance = levenshtein(modified, original) as f64;
                        (
                            (distance / original_len as f64).min(1.0),
                            original_len as u64,
                            modified.chars().count() as u64,
                        )
                    };
                ModificationEvent {
                    session_id: entry.session_id,
                    request_id: entry.request_id,
                    language: entry.language,
                    modification_percentage: percentage,
                    original_char_count: original_chars,
                    modified_char_count: modified_chars,
                }
            }
        };
        if let Err(error) = self.sink.send_modification(event) {
            debug!(%error, "failed to send modification telemetry");
        }
    }
}
