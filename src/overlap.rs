//! Right-context overlap resolution
//!
//! A suggestion may duplicate text already sitting to the right of the
//! cursor: when the user types `foo(` with `)` auto-inserted, a candidate
//! ending in `)` should not insert a second one. The resolver finds the
//! longest suffix of the candidate that equals a prefix of the existing
//! right context, with newline-aware cutoff rules so characters on lines
//! the user has not reached yet are never treated as duplicates.
//!
//! All functions here are pure and lock-free; they may be called
//! concurrently for different requests.

/// Longest suffix of `suggestion_tail` that is also a prefix of
/// `right_context`, or `""` when none exists.
///
/// Only exact tail-vs-head equality is considered at each length; there is
/// no substring or rotation matching.
pub fn overlap(suggestion_tail: &str, right_context: &str) -> String {
    let tail: Vec<char> = suggestion_tail.chars().collect();
    let context: Vec<char> = right_context.chars().collect();
    let max_len = tail.len().min(context.len());
    for k in (1..=max_len).rev() {
        if tail[tail.len() - k..] == context[..k] {
            return context[..k].iter().collect();
        }
    }
    String::new()
}

/// Overlap between a candidate suggestion and the text following the cursor,
/// refusing matches that would cross a line boundary.
///
/// Two refusal rules on top of [`overlap`]:
/// - the right context begins with a newline (its first line is empty): the
///   nearest existing characters are on a line the user has not reached, so
///   nothing counts as already present;
/// - the matched run itself spans a newline and is not whitespace-only.
pub fn find_right_context_overlap(right_context: &str, candidate_tail: &str) -> String {
    let first_line = right_context.split('\n').next().unwrap_or_default();
    if first_line.is_empty() {
        return String::new();
    }
    let matched = overlap(candidate_tail, right_context);
    if matched.contains('\n') && !matched.trim().is_empty() {
        return String::new();
    }
    matched
}

/// Collapse a leading run of two or more newline characters down to exactly
/// one.
///
/// Handles a generation artifact where a suggestion arrives with a spurious
/// blank line before the real content. Pure prefix collapse, not a general
/// whitespace normalizer.
pub fn trim_extra_prefix_new_line(text: &str) -> String {
    let run = text.chars().take_while(|&c| c == '\n').count();
    if run >= 2 {
        // '\n' is a single byte, so byte indexing by the run length is safe
        format!("\n{}", &text[run..])
    } else {
        text.to_string()
    }
}
