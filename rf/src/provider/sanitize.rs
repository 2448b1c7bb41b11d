//! Provider error message sanitizer
//!
//! Masks anything that looks like a credential, collapses whitespace and
//! bounds the length of messages that cross the provider boundary.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a sanitized message, including the `...` suffix
pub const MAX_MESSAGE_LEN: usize = 160;

/// Runs of 12 or more token characters: API keys, bearer tokens, request ids
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_\-]{12,}").expect("token pattern is a valid regex"));

/// Sanitize a raw provider/transport message for display
pub fn sanitize_message(message: &str) -> String {
    let masked = TOKEN_PATTERN.replace_all(message, "***");

    let collapsed = masked.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_MESSAGE_LEN {
        let head: String = collapsed.chars().take(MAX_MESSAGE_LEN - 3).collect();
        format!("{}...", head)
    } else {
        collapsed
    }
}
