//! Search query parser.
//!
//! Turns the user's search text into a [`Query`]. Parsing never fails: anything that
//! cannot be read as a special form degrades to a plain substring search.
//!
//! # Syntax
//!
//! ```text
//! alpha              substring (case-insensitive)
//! alpha|beta|gamma   any of the terms
//! /al+pha\d/         case-insensitive regex
//! id:abc             id equality or substring
//! ids:a,b c          several ids, comma or whitespace separated
//! not:debug,draft    exclusions, combinable with every form above
//! ```
//!
//! A `not:` token counts only at the start of the text or after whitespace, so
//! `xnot:debug` stays part of the search text. Removing a token also drops the
//! whitespace around it; spacing elsewhere in the text is kept as typed.
//!
//! # Examples
//!
//! ```rust
//! # use chat_history_manager::filters::parser::parse_query;
//! # use chat_history_manager::filters::ast::QueryMode;
//! let query = parse_query("alpha not:debug");
//! assert_eq!(query.mode, QueryMode::Contains("alpha".to_string()));
//! assert_eq!(query.exclusions, vec!["debug".to_string()]);
//!
//! // A broken regex is read literally
//! let query = parse_query("/[/");
//! assert_eq!(query.mode, QueryMode::Contains("/[/".to_string()));
//! ```

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::ast::{Query, QueryMode};

static EXCLUSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)not:(\S+)").expect("exclusion pattern is valid")
});

static ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^ids?:(.+)$").expect("id pattern is valid"));

static REGEX_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^/(.+)/$").expect("regex literal pattern is valid"));

/// Parse search text into a [`Query`]
///
/// Steps, in order:
/// 1. Empty input → `None`
/// 2. `not:` tokens are pulled out into exclusions
/// 3. Nothing left → `All`
/// 4. `id:` / `ids:` → `Id`
/// 5. `/.../` that compiles → `Regex`
/// 6. `a|b` with at least two terms → `Or`
/// 7. Otherwise → `Contains`
pub fn parse_query(input: &str) -> Query {
    let text = input.trim();
    if text.is_empty() {
        return Query::none();
    }

    let (remainder, exclusions) = extract_exclusions(text);
    let remainder = remainder.trim();

    if remainder.is_empty() {
        return Query::new(QueryMode::All, exclusions);
    }

    if let Some(caps) = ID_PREFIX.captures(remainder) {
        let ids = split_ids(&caps[1]);
        if !ids.is_empty() {
            return Query::new(QueryMode::Id(ids), exclusions);
        }
    }

    if let Some(caps) = REGEX_LITERAL.captures(remainder) {
        match RegexBuilder::new(&caps[1]).case_insensitive(true).build() {
            Ok(regex) => return Query::new(QueryMode::Regex(regex), exclusions),
            Err(e) => tracing::debug!(pattern = %&caps[1], error = %e, "Invalid regex, searching literally"),
        }
    }

    if remainder.contains('|') {
        let terms: Vec<String> = remainder
            .split('|')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.len() >= 2 {
            return Query::new(QueryMode::Or(terms), exclusions);
        }
    }

    Query::new(QueryMode::Contains(remainder.to_lowercase()), exclusions)
}

/// Remove every `not:a,b` token, returning the remaining text and the collected terms
fn extract_exclusions(text: &str) -> (String, Vec<String>) {
    let mut exclusions = Vec::new();
    for caps in EXCLUSION_TOKEN.captures_iter(text) {
        for term in caps[1].split(',') {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !exclusions.contains(&term) {
                exclusions.push(term);
            }
        }
    }

    if exclusions.is_empty() && !EXCLUSION_TOKEN.is_match(text) {
        return (text.to_string(), exclusions);
    }

    (strip_tokens(text), exclusions)
}

/// Cut out each exclusion token with its surrounding whitespace, leaving one space
/// where text remains on both sides
fn strip_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for token in EXCLUSION_TOKEN.find_iter(text) {
        let before = &text[last..token.start()];
        let before = if last > 0 { before.trim_start() } else { before };
        out.push_str(before.trim_end());
        if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
        last = token.end();
    }
    out.push_str(text[last..].trim_start());
    out.trim_end().to_string()
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_query(""), Query::none());
        assert_eq!(parse_query("   \t  "), Query::none());
    }

    #[test]
    fn test_parse_contains_lowercases() {
        let query = parse_query("  Alpha Project ");
        assert_eq!(query.mode, QueryMode::Contains("alpha project".to_string()));
        assert!(query.exclusions.is_empty());
    }

    #[test]
    fn test_parse_exclusion_only_is_all() {
        let query = parse_query("not:draft");
        assert_eq!(query.mode, QueryMode::All);
        assert_eq!(query.exclusions, vec!["draft".to_string()]);
    }

    #[test]
    fn test_parse_multiple_exclusions_union() {
        let query = parse_query("alpha NOT:Debug,test not:draft");
        assert_eq!(query.mode, QueryMode::Contains("alpha".to_string()));
        assert_eq!(
            query.exclusions,
            vec!["debug".to_string(), "test".to_string(), "draft".to_string()]
        );
    }

    #[test]
    fn test_parse_exclusion_in_middle_of_text() {
        let query = parse_query("alpha not:debug project");
        assert_eq!(query.mode, QueryMode::Contains("alpha project".to_string()));
    }

    #[test]
    fn test_parse_exclusion_keeps_inner_spacing() {
        assert_eq!(parse_query("foo  bar").mode, QueryMode::Contains("foo  bar".to_string()));
        assert_eq!(
            parse_query("foo  bar not:x").mode,
            QueryMode::Contains("foo  bar".to_string())
        );
        assert_eq!(
            parse_query("not:x  foo  bar   not:y").mode,
            QueryMode::Contains("foo  bar".to_string())
        );
        assert_eq!(parse_query("a not:x not:y b").mode, QueryMode::Contains("a b".to_string()));
    }

    #[test]
    fn test_parse_not_glued_to_word_is_literal() {
        let query = parse_query("alpha xnot:debug");
        assert_eq!(query.mode, QueryMode::Contains("alpha xnot:debug".to_string()));
        assert!(query.exclusions.is_empty());

        let query = parse_query("alpha\tnot:debug");
        assert_eq!(query.mode, QueryMode::Contains("alpha".to_string()));
        assert_eq!(query.exclusions, vec!["debug".to_string()]);
    }

    #[test]
    fn test_parse_malformed_not_is_literal() {
        // No term after the colon: nothing to extract
        let query = parse_query("not:");
        assert_eq!(query.mode, QueryMode::Contains("not:".to_string()));
        assert!(query.exclusions.is_empty());
    }

    #[test]
    fn test_parse_id_single() {
        let query = parse_query("id:abc-123");
        assert_eq!(query.mode, QueryMode::Id(vec!["abc-123".to_string()]));
    }

    #[test]
    fn test_parse_ids_mixed_separators() {
        let query = parse_query("IDS:AA, bb cc");
        assert_eq!(
            query.mode,
            QueryMode::Id(vec!["AA".to_string(), "bb".to_string(), "cc".to_string()])
        );
    }

    #[test]
    fn test_parse_regex() {
        let query = parse_query("/al+pha\\d/");
        match query.mode {
            QueryMode::Regex(ref re) => {
                assert!(re.is_match("ALLPHA7"));
                assert!(!re.is_match("alpha"));
            }
            other => panic!("expected regex mode, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_regex_falls_back_to_literal() {
        let query = parse_query("/[/");
        assert_eq!(query.mode, QueryMode::Contains("/[/".to_string()));
    }

    #[test]
    fn test_parse_invalid_regex_with_pipe_becomes_or() {
        let query = parse_query("/(a|b/");
        assert_eq!(query.mode, QueryMode::Or(vec!["/(a".to_string(), "b/".to_string()]));
    }

    #[test]
    fn test_parse_or_terms() {
        let query = parse_query("Alpha | beta|GAMMA");
        assert_eq!(
            query.mode,
            QueryMode::Or(vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()])
        );
    }

    #[test]
    fn test_parse_single_term_pipe_is_contains() {
        let query = parse_query("alpha|");
        assert_eq!(query.mode, QueryMode::Contains("alpha|".to_string()));
    }

    #[test]
    fn test_parse_is_idempotent() {
        for input in ["alpha not:x", "/a.b/", "a|b", "ids:1,2", "", "not:", "/[/"] {
            assert_eq!(parse_query(input), parse_query(input), "input: {:?}", input);
        }
    }

    #[test]
    fn test_parse_never_panics_on_odd_input() {
        for input in ["//", "/", "|", "||", "id:", "ids: ,", "not:,,", "/(/ not:a", "ünï|cödé"] {
            let _ = parse_query(input);
        }
    }
}
