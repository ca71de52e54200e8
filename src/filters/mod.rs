pub mod apply;
pub mod ast;
pub mod matcher;
pub mod parser;

pub use apply::{FilterCriteria, apply_filters};
pub use ast::{Query, QueryMode};
pub use parser::parse_query;
