//! In-memory stand-ins for the external collaborators: a fake editor with
//! sticky span tracking, a recording telemetry sink, and a toggleable
//! settings store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use inline_acceptance::document::{AcceptedSpan, DocumentChange, DocumentId, DocumentSource};
use inline_acceptance::events::{
    CodeCoverageEvent, ModificationEvent, TelemetryError, TelemetrySettings, TelemetrySink,
};

/// A live range inside a fake document, shifted by later edits the way an
/// editor's sticky range would be. `None` once invalidated.
type StickyRange = Option<(usize, usize)>;

#[derive(Default)]
struct FakeDocument {
    text: String,
    /// Keyed by the span's offsets at insertion time.
    ranges: HashMap<(usize, usize), StickyRange>,
}

/// Minimal in-memory editor: byte-offset documents (tests stick to ASCII),
/// sticky ranges registered at suggestion insertion, invalidation on
/// overlapping edits or document close.
#[derive(Default)]
pub struct FakeEditor {
    documents: Mutex<HashMap<DocumentId, FakeDocument>>,
}

impl FakeEditor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self, document: DocumentId, text: &str) {
        self.documents.lock().insert(
            document,
            FakeDocument { text: text.to_string(), ranges: HashMap::new() },
        );
    }

    pub fn close(&self, document: DocumentId) {
        self.documents.lock().remove(&document);
    }

    pub fn text(&self, document: DocumentId) -> String {
        self.documents.lock()[&document].text.clone()
    }

    /// Splices a suggestion into the document and registers a sticky range
    /// for it. Returns the span the pipeline should track.
    pub fn insert_suggestion(&self, document: DocumentId, offset: usize, text: &str) -> AcceptedSpan {
        let mut documents = self.documents.lock();
        let doc = documents.get_mut(&document).expect("document not open");
        doc.text.insert_str(offset, text);
        let range = (offset, offset + text.len());
        doc.ranges.insert(range, Some(range));
        AcceptedSpan::new(document, offset, text)
    }

    /// Replaces `old_len` bytes at `offset` with `new_text`, adjusting or
    /// invalidating registered sticky ranges, and returns the change event
    /// the editor would deliver.
    pub fn edit(
        &self,
        document: DocumentId,
        offset: usize,
        old_len: usize,
        new_text: &str,
    ) -> DocumentChange {
        let mut documents = self.documents.lock();
        let doc = documents.get_mut(&document).expect("document not open");
        doc.text.replace_range(offset..offset + old_len, new_text);

        let delta = new_text.len() as i64 - old_len as i64;
        let edit_end = offset + old_len;
        for sticky in doc.ranges.values_mut() {
            let Some((start, end)) = *sticky else { continue };
            *sticky = if edit_end <= start {
                // edit entirely before the range: shift
                Some((
                    (start as i64 + delta) as usize,
                    (end as i64 + delta) as usize,
                ))
            } else if offset >= start && edit_end <= end {
                // edit entirely inside the range: resize
                Some((start, (end as i64 + delta) as usize))
            } else if offset >= end {
                // edit entirely after the range: untouched
                Some((start, end))
            } else {
                // edit straddles a boundary: range is gone
                None
            };
        }

        DocumentChange {
            document,
            old_length: old_len,
            new_length: new_text.chars().count(),
            inserted_text: new_text.to_string(),
            is_whole_document_replace: false,
            previous_timestamp: Some(std::time::SystemTime::now()),
        }
    }

    /// The change event the editor delivers for the suggestion insertion
    /// itself (the echo the ledger's accept correction compensates for).
    pub fn insertion_echo(&self, document: DocumentId, text: &str) -> DocumentChange {
        DocumentChange::insertion(document, text)
    }
}

impl DocumentSource for FakeEditor {
    fn span_text(&self, span: &AcceptedSpan) -> Option<String> {
        let documents = self.documents.lock();
        let doc = documents.get(&span.document)?;
        let sticky = doc.ranges.get(&(span.start, span.end))?;
        let (start, end) = (*sticky)?;
        doc.text.get(start..end).map(str::to_string)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub coverage: Mutex<Vec<CodeCoverageEvent>>,
    pub modifications: Mutex<Vec<ModificationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl TelemetrySink for RecordingSink {
    fn send_code_coverage(&self, event: CodeCoverageEvent) -> Result<(), TelemetryError> {
        self.coverage.lock().push(event);
        Ok(())
    }

    fn send_modification(&self, event: ModificationEvent) -> Result<(), TelemetryError> {
        self.modifications.lock().push(event);
        Ok(())
    }
}

pub struct ToggleSettings(AtomicBool);

impl ToggleSettings {
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(enabled)))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }
}

impl TelemetrySettings for ToggleSettings {
    fn is_telemetry_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
