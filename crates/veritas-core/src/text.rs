//! # Text Normalization
//!
//! Case folding, accent stripping and tokenization shared by label
//! normalization and the lexical index.
//!
//! All functions here are pure and deterministic.

use crate::primitives::MIN_TOKEN_LENGTH;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Decompose, drop combining marks and lowercase.
fn fold_once(text: &str) -> String {
    let stripped: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.to_lowercase()
}

/// Lowercase and strip accents.
///
/// Folding runs twice because lowercasing can itself produce decomposable
/// characters (e.g. `İ` lowercases to `i` + combining dot), so a single pass
/// would not be a fixed point.
#[must_use]
pub fn fold(text: &str) -> String {
    fold_once(&fold_once(text))
}

/// Normalize a classification label.
///
/// Folds case and accents, trims and collapses inner whitespace.
/// Idempotent: `normalize_label(&normalize_label(x)) == normalize_label(x)`.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    fold(label).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into index terms.
///
/// Folds case and accents, splits on every non `[a-z0-9]` character and drops
/// tokens shorter than `MIN_TOKEN_LENGTH`.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| t.len() >= MIN_TOKEN_LENGTH)
        .map(str::to_string)
        .collect()
}

/// First `max_chars` characters of `text`.
#[must_use]
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// =============================================================================
// TESTS
// =============================================================================
