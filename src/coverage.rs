//! Windowed coverage aggregation
//!
//! One [`CoverageTracker`] per language owns an [`AcceptanceLedger`] and a
//! repeating flush timer (default window: 5 minutes). On each fire it
//! snapshots the ledger, emits one [`CodeCoverageEvent`] when the window saw
//! activity, and reschedules. Windows with no typed chars or no service
//! invocation are skipped entirely rather than reported as 0%.
//!
//! The timer is a plain tokio task parked on `select!` between the window
//! sleep and a broadcast shutdown channel; disposal cancels the task and
//! runs one final synchronous flush. Distinct language trackers are fully
//! independent and may flush concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::document::{AcceptedSpan, DocumentChange, DocumentSource};
use crate::events::{CodeCoverageEvent, TelemetrySettings, TelemetrySink};
use crate::ledger::{AcceptanceLedger, CoverageSnapshot};

/// Default aggregation window.
pub const DEFAULT_COVERAGE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Aggregates acceptance counters for one language over repeating time
/// windows and emits a percentage metric per window.
pub struct CoverageTracker {
    language: String,
    ledger: AcceptanceLedger,
    sink: Arc<dyn TelemetrySink>,
    settings: Arc<dyn TelemetrySettings>,
    customization_id: Option<String>,
    window: Duration,
    shutdown_tx: broadcast::Sender<()>,
    is_shutting_down: AtomicBool,
}

impl CoverageTracker {
    /// Creates the tracker and spawns its flush timer on the current tokio
    /// runtime.
    pub fn start(
        language: impl Into<String>,
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn TelemetrySink>,
        settings: Arc<dyn TelemetrySettings>,
        window: Duration,
        customization_id: Option<String>,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let tracker = Arc::new(Self {
            language: language.into(),
            ledger: AcceptanceLedger::new(source),
            sink,
            settings,
            customization_id,
            window,
            shutdown_tx,
            is_shutting_down: AtomicBool::new(false),
        });
        Self::spawn_flush_timer(tracker.clone());
        tracker
    }

    fn spawn_flush_timer(tracker: Arc<Self>) {
        let mut shutdown_rx = tracker.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(tracker.window) => {
                        // a panicking sink must not kill the timer; the next
                        // window is always scheduled
                        let flush = std::panic::catch_unwind(
                            std::panic::AssertUnwindSafe(|| tracker.flush()),
                        );
                        if flush.is_err() {
                            warn!(language = %tracker.language, "coverage flush panicked");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!(language = %tracker.language, "coverage flush timer cancelled");
                        break;
                    }
                }
            }
        });
    }

    /// Forwarded from the host editor's change listener. Hot path.
    pub fn document_changed(&self, change: &DocumentChange) {
        self.ledger.document_changed(change);
    }

    /// Records an accepted suggestion for this language.
    pub fn on_accept(&self, span: AcceptedSpan) {
        self.ledger.on_accept(span);
    }

    /// Records one successful completion-service invocation.
    pub fn record_invocation(&self) {
        self.ledger.record_invocation();
    }

    /// Snapshot-and-reset the window, emitting a coverage event when the
    /// window had activity. Called by the timer and once more on disposal;
    /// also the hook for host-driven flushes in tests.
    pub fn flush(&self) {
        // Polled live so a settings toggle takes effect on the next window.
        let enabled = self.settings.is_telemetry_enabled();
        let snapshot = self.ledger.snapshot_and_reset();
        if !enabled {
            debug!(language = %self.language, "telemetry disabled; window reset without emission");
            return;
        }
        self.emit(snapshot);
    }

    fn emit(&self, snapshot: CoverageSnapshot) {
        let Some(percentage) = snapshot.percentage() else {
            return;
        };
        // No successful invocation means the user never saw a suggestion in
        // this window; an acceptance percentage would be meaningless.
        if snapshot.invocation_count == 0 {
            return;
        }
        let event = CodeCoverageEvent {
            language: self.language.clone(),
            accepted_chars: snapshot.accepted_chars,
            unmodified_accepted_chars: snapshot.unmodified_accepted_chars,
            total_chars: snapshot.total_chars,
            percentage,
            invocation_count: snapshot.invocation_count,
            customization_id: self.customization_id.clone(),
        };
        if let Err(error) = self.sink.send_code_coverage(event) {
            debug!(language = %self.language, %error, "failed to send code coverage telemetry");
        }
    }

    /// Cancels the flush timer and performs one final best-effort flush.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.is_shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        self.flush();
    }

    /// Spans accepted in the current window and not yet flushed.
    pub fn tracked_span_count(&self) -> usize {
        self.ledger.tracked_span_count()
    }
}

/// Explicit per-language tracker registry, injected at construction and torn
/// down with the editing session. Replaces any process-wide singleton map.
pub struct CoverageTrackerRegistry {
    trackers: DashMap<String, Arc<CoverageTracker>>,
    source: Arc<dyn DocumentSource>,
    sink: Arc<dyn TelemetrySink>,
    settings: Arc<dyn TelemetrySettings>,
    window: Duration,
    customization_id: Option<String>,
}

impl CoverageTrackerRegistry {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn TelemetrySink>,
        settings: Arc<dyn TelemetrySettings>,
    ) -> Self {
        Self::with_window(source, sink, settings, DEFAULT_COVERAGE_WINDOW)
    }

    pub fn with_window(
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn TelemetrySink>,
        settings: Arc<dyn TelemetrySettings>,
        window: Duration,
    ) -> Self {
        Self {
            trackers: DashMap::new(),
            source,
            sink,
            settings,
            window,
            customization_id: None,
        }
    }

    pub fn with_customization_id(mut self, customization_id: impl Into<String>) -> Self {
        self.customization_id = Some(customization_id.into());
        self
    }

    /// Returns the tracker for `language`, creating and starting it on first
    /// use.
    pub fn tracker_for(&self, language: &str) -> Arc<CoverageTracker> {
        self.trackers
            .entry(language.to_string())
            .or_insert_with(|| {
                CoverageTracker::start(
                    language,
                    self.source.clone(),
                    self.sink.clone(),
                    self.settings.clone(),
                    self.window,
                    self.customization_id.clone(),
                )
            })
            .clone()
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// Disposes every tracker (final flush included) and empties the
    /// registry. Safe to call more than once.
    pub fn dispose_all(&self) {
        for tracker in self.trackers.iter() {
            tracker.dispose();
        }
        self.trackers.clear();
    }
}
