//! Per-document acceptance bookkeeping
//!
//! An [`AcceptanceLedger`] owns the counters for every document of one
//! language: chars the user typed, chars inserted by accepted suggestions,
//! and the edit-distance-adjusted count of accepted chars that survived the
//! user's later edits.
//!
//! Counters are mutated from the editor-event thread and read-and-cleared
//! from the background flush timer, so every field is atomic. The snapshot
//! clears each field individually rather than transactionally; slight
//! cross-field skew at a flush boundary is acceptable for telemetry.
//!
//! `document_changed` is the hot path (fires on every keystroke): it takes
//! no lock beyond a DashMap shard and performs no allocation.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::distance::unmodified_chars;
use crate::document::{AcceptedSpan, DocumentChange, DocumentId, DocumentSource};

/// Changes at least this long are treated as paste/formatter output rather
/// than hand-typed input.
const BULK_CHANGE_THRESHOLD: usize = 50;

/// Per-document coverage counters. Monotonically non-negative; `total_chars`
/// can be decremented once per acceptance to correct double counting, and is
/// clamped at zero after every mutation.
#[derive(Debug, Default)]
struct CoverageCounters {
    total_chars: AtomicI64,
    accepted_chars: AtomicI64,
    unmodified_accepted_chars: AtomicI64,
}

/// One window's worth of aggregated counters across all documents of a
/// language, consumed exactly once by the flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageSnapshot {
    pub total_chars: u64,
    pub accepted_chars: u64,
    pub unmodified_accepted_chars: u64,
    pub invocation_count: u32,
}

impl CoverageSnapshot {
    /// `round(100 * accepted / total)`, or `None` for a window with no
    /// observed activity (such a window must not emit a 0%).
    pub fn percentage(&self) -> Option<u64> {
        if self.total_chars == 0 {
            return None;
        }
        Some(((self.accepted_chars as f64 * 100.0) / self.total_chars as f64).round() as u64)
    }
}

/// Acceptance bookkeeping for all documents of one language.
pub struct AcceptanceLedger {
    counters: DashMap<DocumentId, CoverageCounters>,
    spans: Mutex<Vec<AcceptedSpan>>,
    invocation_count: AtomicU32,
    source: Arc<dyn DocumentSource>,
}

impl AcceptanceLedger {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            counters: DashMap::new(),
            spans: Mutex::new(Vec::new()),
            invocation_count: AtomicU32::new(0),
            source,
        }
    }

    /// Classifies a raw document mutation and updates `total_chars`.
    ///
    /// Rules, in order:
    /// - whole-document replace on a freshly opened document: editor-load
    ///   artifact, ignored entirely;
    /// - single-char insertion, or a newline followed only by whitespace
    ///   (enter with auto-indent): one keystroke, +1;
    /// - short non-whitespace change (< 50 chars): IME / auto-close input,
    ///   counted at its full length;
    /// - anything else (large paste, formatter rewrite, pure whitespace):
    ///   not user-written, no counter change.
    pub fn document_changed(&self, change: &DocumentChange) {
        if change.is_whole_document_replace {
            debug!(document = change.document.0, "whole-document replace event");
            if change.previous_timestamp.is_none() {
                return;
            }
        }
        let text = change.inserted_text.as_str();
        if (change.new_length == 1 && change.old_length == 0)
            || (text.starts_with('\n') && text.trim().is_empty())
        {
            self.add_total(change.document, 1);
        } else if change.new_length < BULK_CHANGE_THRESHOLD && !text.trim().is_empty() {
            self.add_total(change.document, change.new_length as i64);
        }
    }

    /// Records an accepted suggestion span.
    ///
    /// The accepted text counts toward `total_chars` as well (it is part of
    /// the denominator). The insertion itself also echoes through
    /// `document_changed`, so when its current length falls in the range
    /// that classifier counts as user input (2..=49 chars) the echo is
    /// compensated by decrementing `total_chars` once. The 2 and 49 bounds
    /// are load-bearing for telemetry comparability across clients.
    pub fn on_accept(&self, span: AcceptedSpan) {
        let original_len = span.original_text.chars().count() as i64;
        self.add_total(span.document, original_len);

        let current_len = self
            .source
            .span_text(&span)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        if (2..BULK_CHANGE_THRESHOLD).contains(&current_len)
            && !span.original_text.trim().is_empty()
        {
            self.add_total(span.document, -(current_len as i64));
        }

        self.spans.lock().push(span);
    }

    /// Records one successful completion-service invocation.
    pub fn record_invocation(&self) {
        self.invocation_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Scores every still-valid tracked span, returns the aggregate across
    /// all documents, and zeroes all state. A second immediate call returns
    /// an all-zero snapshot.
    ///
    /// Each counter field is consumed with an atomic swap, so a keystroke
    /// increment racing the flush lands in either this window or the next,
    /// never nowhere. The counter structs stay in the map and are reused.
    pub fn snapshot_and_reset(&self) -> CoverageSnapshot {
        let spans = std::mem::take(&mut *self.spans.lock());
        for span in &spans {
            // Invalidated spans (document closed, range overwritten) are
            // skipped, never surfaced as errors.
            let Some(current) = self.source.span_text(span) else {
                debug!(document = span.document.0, start = span.start, "skipping invalid span");
                continue;
            };
            let original = span.original_text.as_str();
            self.add_accepted(span.document, original.chars().count() as i64);
            self.add_unmodified(span.document, unmodified_chars(original, &current) as i64);
        }

        let mut snapshot = CoverageSnapshot {
            invocation_count: self.invocation_count.swap(0, Ordering::Relaxed),
            ..CoverageSnapshot::default()
        };
        for entry in self.counters.iter() {
            snapshot.total_chars += entry.total_chars.swap(0, Ordering::Relaxed).max(0) as u64;
            snapshot.accepted_chars += entry.accepted_chars.swap(0, Ordering::Relaxed).max(0) as u64;
            snapshot.unmodified_accepted_chars +=
                entry.unmodified_accepted_chars.swap(0, Ordering::Relaxed).max(0) as u64;
        }
        snapshot
    }

    /// Number of spans currently tracked (accepted but not yet flushed).
    pub fn tracked_span_count(&self) -> usize {
        self.spans.lock().len()
    }

    fn add_total(&self, document: DocumentId, delta: i64) {
        let counters = self.counters.entry(document).or_default();
        // add and clamp in one atomic step; the closure always succeeds
        let _ = counters
            .total_chars
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some((total + delta).max(0))
            });
    }

    fn add_accepted(&self, document: DocumentId, delta: i64) {
        self.counters
            .entry(document)
            .or_default()
            .accepted_chars
            .fetch_add(delta, Ordering::Relaxed);
    }

    fn add_unmodified(&self, document: DocumentId, delta: i64) {
        self.counters
            .entry(document)
            .or_default()
            .unmodified_accepted_chars
            .fetch_add(delta, Ordering::Relaxed);
    }
}
