//! Edit-distance scoring for accepted suggestions
//!
//! Levenshtein distance is the single primitive the pipeline uses to answer
//! "how much was this string changed after insertion". Distance computation
//! delegates to `strsim` (char-based, unit cost for insert/delete/substitute).

/// Classic Levenshtein edit distance between two strings.
///
/// Deterministic, total, no side effects.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Estimated count of accepted characters that still match the original
/// insertion after the user's subsequent edits.
///
/// Defined as `max(|original|, |modified|) - distance(original, modified)`,
/// in chars. Unit-cost Levenshtein distance never exceeds the longer length,
/// so the result is non-negative.
pub fn unmodified_chars(original: &str, modified: &str) -> u64 {
    let original_len = original.chars().count();
    let modified_len = modified.chars().count();
    (original_len.max(modified_len) - levenshtein(original, modified)) as u64
}
