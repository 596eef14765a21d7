//! Boundary types for the host editor
//!
//! The pipeline never talks to a concrete editor. The host delivers
//! [`DocumentChange`] events from its change listener and implements
//! [`DocumentSource`] so the trackers can re-read the current text of an
//! accepted span. Sticky-range adjustment (keeping offsets in sync with
//! later edits) is the host's job; the core only needs "current text of this
//! logical span, or learn it is invalid".

use std::time::SystemTime;

use serde::Serialize;

/// Stable identity of an open document for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentId(pub u64);

/// One raw document mutation as delivered by the host editor's change
/// listener. Fires on every keystroke, so this stays small and borrowable.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub document: DocumentId,
    /// Length in chars of the replaced region before the change.
    pub old_length: usize,
    /// Length in chars of the inserted text.
    pub new_length: usize,
    pub inserted_text: String,
    /// Set when the editor replaced the whole document content at once.
    pub is_whole_document_replace: bool,
    /// `None` for the very first change of a freshly opened document; the
    /// editor emits a whole-text replace while loading, which is not user
    /// input.
    pub previous_timestamp: Option<SystemTime>,
}

impl DocumentChange {
    /// A plain insertion with no replaced text.
    pub fn insertion(document: DocumentId, inserted_text: impl Into<String>) -> Self {
        let inserted_text = inserted_text.into();
        Self {
            document,
            old_length: 0,
            new_length: inserted_text.chars().count(),
            inserted_text,
            is_whole_document_replace: false,
            previous_timestamp: Some(SystemTime::now()),
        }
    }
}

/// The span a suggestion occupied at the moment it was inserted, plus the
/// inserted text. Exactly one per accepted suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSpan {
    pub document: DocumentId,
    pub start: usize,
    pub end: usize,
    pub original_text: String,
}

impl AcceptedSpan {
    pub fn new(document: DocumentId, start: usize, original_text: impl Into<String>) -> Self {
        let original_text = original_text.into();
        let end = start + original_text.chars().count();
        Self { document, start, end, original_text }
    }
}

/// Read access to live documents, implemented by the host editor layer.
pub trait DocumentSource: Send + Sync {
    /// Current text of the logical span, tracked through subsequent edits by
    /// the host. `None` when the document is closed or the range has been
    /// invalidated by overlapping edits.
    fn span_text(&self, span: &AcceptedSpan) -> Option<String>;
}
