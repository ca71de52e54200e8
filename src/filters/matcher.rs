//! Per-field matching and snippet extraction.
//!
//! Callers pass both the original text and its cached lowercase form so matching
//! never re-lowercases a field on the hot path.

use super::ast::{Query, QueryMode};

/// Characters of context shown on each side of a match by default
pub const DEFAULT_CONTEXT_CHARS: usize = 40;

const ELLIPSIS: &str = "...";

/// True if the lowercase field contains any exclusion term
pub fn is_excluded(text_lower: &str, query: &Query) -> bool {
    query.exclusions.iter().any(|term| text_lower.contains(term.as_str()))
}

/// Evaluate a query against one field.
///
/// Exclusions win over every mode. `Id` queries always return false here; ids are
/// matched with [`matches_id`].
pub fn matches(text: &str, text_lower: &str, query: &Query) -> bool {
    if is_excluded(text_lower, query) {
        return false;
    }

    match &query.mode {
        QueryMode::None | QueryMode::All => true,
        QueryMode::Contains(pattern) => text_lower.contains(pattern.as_str()),
        QueryMode::Or(terms) => terms.iter().any(|t| text_lower.contains(t.as_str())),
        QueryMode::Regex(regex) => regex.is_match(text),
        QueryMode::Id(_) => false,
    }
}

/// Case-sensitive id match: exact equality or substring, for any listed id
pub fn matches_id(id: &str, query: &Query) -> bool {
    match &query.mode {
        QueryMode::Id(ids) => ids.iter().any(|wanted| id == wanted || id.contains(wanted.as_str())),
        _ => false,
    }
}

/// Extract up to `context_chars` characters either side of the first match.
///
/// Truncated edges get `...` markers and newlines are flattened. Returns an empty
/// string when the mode has nothing to locate.
pub fn snippet(text: &str, query: &Query, context_chars: usize) -> String {
    let Some((start, len)) = locate(text, query) else {
        return String::new();
    };

    let chars: Vec<char> = text.chars().collect();
    let from = start.saturating_sub(context_chars);
    let to = start.saturating_add(len).saturating_add(context_chars).min(chars.len());

    let mut out = String::new();
    if from > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(chars[from..to].iter().map(|&c| if c == '\n' || c == '\r' { ' ' } else { c }));
    if to < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Char offset and char length of the first match for the active mode
fn locate(text: &str, query: &Query) -> Option<(usize, usize)> {
    match &query.mode {
        QueryMode::Contains(pattern) => locate_lowercase(text, pattern),
        QueryMode::Or(terms) => terms
            .iter()
            .filter_map(|t| locate_lowercase(text, t))
            .min_by_key(|&(start, _)| start),
        QueryMode::Regex(regex) => regex.find(text).map(|m| {
            let start = text[..m.start()].chars().count();
            (start, m.as_str().chars().count())
        }),
        QueryMode::None | QueryMode::All | QueryMode::Id(_) => None,
    }
}

/// Find a lowercase needle in `text`, reporting the position in original chars.
///
/// The haystack is lowered with `str::to_lowercase`, the same as the record caches
/// and the parsed pattern (word-final sigma included). Lowercasing can change byte
/// lengths, so each lowered byte remembers the original char it came from.
fn locate_lowercase(text: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }

    let lowered = text.to_lowercase();
    let mut owners: Vec<usize> = Vec::with_capacity(lowered.len());
    for (idx, ch) in text.chars().enumerate() {
        let width: usize = ch.to_lowercase().map(char::len_utf8).sum();
        owners.resize(owners.len() + width, idx);
    }

    let pos = lowered.find(needle)?;
    let start = *owners.get(pos)?;
    let end = *owners.get(pos + needle.len() - 1)? + 1;
    Some((start, end - start))
}
