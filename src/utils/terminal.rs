//! Terminal output sanitization
//!
//! Titles and previews come from the remote service and may carry ANSI escape sequences
//! or control characters. Everything printed by the CLI goes through
//! [`sanitize_for_display`] first.

use std::sync::LazyLock;

use regex::Regex;

static CSI_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("CSI pattern is valid"));

/// Strips ANSI CSI sequences and control characters (tab, newline and carriage return
/// survive)
///
/// # Examples
///
/// ```
/// use chat_history_manager::utils::terminal::strip_ansi_codes;
///
/// let text = "\x1b[31mRed text\x1b[0m";
/// assert_eq!(strip_ansi_codes(text), "Red text");
/// ```
pub fn strip_ansi_codes(text: &str) -> String {
    CSI_SEQUENCE
        .replace_all(text, "")
        .chars()
        .filter(|&ch| !ch.is_control() || ch == '\t' || ch == '\n' || ch == '\r')
        .collect()
}

/// Single-line, escape-free text clipped to `max_chars` (with a trailing `...`)
pub fn sanitize_for_display(text: &str, max_chars: usize) -> String {
    let flat: String = strip_ansi_codes(text)
        .chars()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .collect();
    let flat = flat.trim();

    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let mut clipped: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    clipped.push_str("...");
    clipped
}
