//! Find/replace: request specs, their MRU list and the pattern matcher.

pub mod finder;
pub mod matcher;

pub use finder::{FindFlags, FindHistory, FindSpec, DEFAULT_FIND_HISTORY};
pub use matcher::{Direction, PatternMatcher, RegexMatcher, Span};
