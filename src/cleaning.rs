// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Review text cleaning
//!
//! Regex-based normalization applied before tokenization. Tag stripping is a
//! heuristic (`<.*?>`), not an HTML parser: malformed or nested markup is
//! handled exactly as the pattern dictates.
//!
//! Whitespace means Unicode whitespace plus the ASCII separators
//! `\x1c`-`\x1f`, which the `regex` crate's `\s` leaves out.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HTML_TAG_RE: Regex = Regex::new(r"<.*?>").unwrap();
    static ref URL_RE: Regex =
        Regex::new(r"http[^\s\x1c-\x1f]+|www[^\s\x1c-\x1f]+|https[^\s\x1c-\x1f]+").unwrap();
    static ref NON_ALPHA_RE: Regex = Regex::new(r"[^a-zA-Z\s\x1c-\x1f]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"[\s\x1c-\x1f]+").unwrap();
}

/// Lowercase, strip tags and URLs, drop non-letters, collapse whitespace
pub fn clean_text(text: &str) -> String {
    let text = text.to_lowercase();
    let text = HTML_TAG_RE.replace_all(&text, "");
    let text = URL_RE.replace_all(&text, "");
    let text = NON_ALPHA_RE.replace_all(&text, "");
    // Deleting punctuation can splice a new URL-like run ("h.ttp" -> "http").
    // One more sweep keeps the function idempotent.
    let text = URL_RE.replace_all(&text, "");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}
