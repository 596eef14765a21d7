//! Suggestion reconciliation
//!
//! Transforms the raw candidate list returned by the completion source into
//! per-candidate decisions: keep as-is, truncate the right-context overlap,
//! or discard (exact duplicate of the user's typing, blank after truncation,
//! or identical to an earlier surviving candidate).
//!
//! The output list is always 1:1 with the input list, in input order; a
//! candidate is only ever flagged, never removed. Pure and synchronous.

use crate::overlap::{find_right_context_overlap, trim_extra_prefix_new_line};

/// One raw suggestion string from the completion source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub content: String,
}

impl Candidate {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

/// Per-candidate reconciliation decision.
///
/// When `is_discarded` is set, `final_text` is irrelevant to the caller.
/// `is_truncated_on_right` can be set independently of `is_discarded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub final_text: String,
    pub is_truncated_on_right: bool,
    pub is_discarded: bool,
}

/// Reconcile `candidates` against what the user already typed
/// (`user_typed_prefix`) and the document text following the cursor
/// (`right_context`).
pub fn reconcile(
    candidates: &[Candidate],
    user_typed_prefix: &str,
    right_context: &str,
) -> Vec<ReconciliationResult> {
    let mut results: Vec<ReconciliationResult> = candidates
        .iter()
        .map(|candidate| reconcile_one(candidate, user_typed_prefix, right_context))
        .collect();

    // Cross-candidate dedup: first surviving occurrence of a final text wins.
    for later in 1..results.len() {
        if results[later].is_discarded {
            continue;
        }
        let duplicate = results[..later]
            .iter()
            .any(|earlier| !earlier.is_discarded && earlier.final_text == results[later].final_text);
        if duplicate {
            results[later].is_discarded = true;
        }
    }

    results
}

fn reconcile_one(
    candidate: &Candidate,
    user_typed_prefix: &str,
    right_context: &str,
) -> ReconciliationResult {
    // A candidate that exactly repeats the user's typing contributes nothing.
    if candidate.content == user_typed_prefix {
        return ReconciliationResult {
            final_text: String::new(),
            is_truncated_on_right: false,
            is_discarded: true,
        };
    }

    let overlap = find_right_context_overlap(right_context, &candidate.content);
    let mut is_truncated_on_right = false;
    let mut text = candidate.content.clone();
    if !overlap.is_empty() {
        text.truncate(text.len() - overlap.len());
        is_truncated_on_right = true;
    }

    let text = trim_extra_prefix_new_line(&text);

    if text.trim().is_empty() {
        return ReconciliationResult {
            final_text: text,
            is_truncated_on_right: true,
            is_discarded: true,
        };
    }

    ReconciliationResult {
        final_text: text,
        is_truncated_on_right,
        is_discarded: false,
    }
}
