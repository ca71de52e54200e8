use regex::Regex;

/// Positive search mode, carrying its payload
#[derive(Debug, Clone)]
pub enum QueryMode {
    /// Empty input: no filtering at all
    None,
    /// Only exclusions were given: everything not excluded matches
    All,
    /// Lowercase substring
    Contains(String),
    /// Any of several lowercase substrings
    Or(Vec<String>),
    /// Case-insensitive regular expression
    Regex(Regex),
    /// Raw id list, matched against record ids only
    Id(Vec<String>),
}

impl PartialEq for QueryMode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueryMode::None, QueryMode::None) | (QueryMode::All, QueryMode::All) => true,
            (QueryMode::Contains(a), QueryMode::Contains(b)) => a == b,
            (QueryMode::Or(a), QueryMode::Or(b)) | (QueryMode::Id(a), QueryMode::Id(b)) => a == b,
            (QueryMode::Regex(a), QueryMode::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for QueryMode {}

/// Parsed search query
///
/// Immutable once built by [`parse_query`](super::parser::parse_query). Exclusions are
/// lowercase substrings checked before the positive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub mode: QueryMode,
    pub exclusions: Vec<String>,
}

impl Query {
    pub fn new(mode: QueryMode, exclusions: Vec<String>) -> Self {
        Self { mode, exclusions }
    }

    /// The empty query
    pub fn none() -> Self {
        Self::new(QueryMode::None, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.mode, QueryMode::None) && self.exclusions.is_empty()
    }

    pub fn is_id_search(&self) -> bool {
        matches!(self.mode, QueryMode::Id(_))
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::none()
    }
}
