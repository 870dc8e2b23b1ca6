/// Pattern matching behind the find/replace engine.
///
/// Offsets going in and out are char offsets; the regex engine works on
/// bytes, so every call converts at the boundary.
use regex::{NoExpand, Regex, RegexBuilder};

use crate::error::DocumentError;
use crate::search::finder::FindFlags;

/// Search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn from_flags(flags: FindFlags) -> Self {
        if flags.contains(FindFlags::SEARCH_UP) {
            Self::Backward
        } else {
            Self::Forward
        }
    }
}

/// A match as char offsets `[start, end)`.
pub type Span = (usize, usize);

/// The matching collaborator of the find/replace engine.
pub trait PatternMatcher: Send {
    /// Finds `pattern` in `haystack`.
    ///
    /// Forward: the first match starting at or after `start`.
    /// Backward: the last match ending at or before `start`.
    fn search(
        &mut self,
        haystack: &str,
        pattern: &str,
        start: usize,
        flags: FindFlags,
        direction: Direction,
    ) -> Result<Option<Span>, DocumentError>;

    /// Checks that `pattern` can be used with `flags`.
    fn validate(&mut self, pattern: &str, flags: FindFlags) -> Result<(), DocumentError>;

    /// Replaces every match, returning the new text and the match count.
    fn replace_all(
        &mut self,
        haystack: &str,
        pattern: &str,
        replacement: &str,
        flags: FindFlags,
    ) -> Result<(String, usize), DocumentError>;
}

/// [`PatternMatcher`] on the `regex` crate. Literal searches are escaped;
/// regex replacements expand `$1` / `${name}` groups.
#[derive(Debug, Default)]
pub struct RegexMatcher {
    /// Compiled regex pattern (cached).
    compiled: Option<Regex>,
    /// The pattern and flags the cached regex was built from.
    compiled_for: Option<(String, FindFlags)>,
}

impl RegexMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn regex(&mut self, pattern: &str, flags: FindFlags) -> Result<&Regex, DocumentError> {
        let key = (pattern.to_string(), flags & !FindFlags::SEARCH_UP);
        if self.compiled_for.as_ref() != Some(&key) || self.compiled.is_none() {
            let source = if flags.contains(FindFlags::REGEX) {
                pattern.to_string()
            } else {
                regex::escape(pattern)
            };
            let regex = RegexBuilder::new(&source)
                .case_insensitive(!flags.contains(FindFlags::CASE_SENSITIVE))
                .build()
                .map_err(|e| DocumentError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
            self.compiled = Some(regex);
            self.compiled_for = Some(key);
        }
        self.compiled
            .as_ref()
            .ok_or_else(|| DocumentError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern was not compiled".to_string(),
            })
    }
}

impl PatternMatcher for RegexMatcher {
    fn search(
        &mut self,
        haystack: &str,
        pattern: &str,
        start: usize,
        flags: FindFlags,
        direction: Direction,
    ) -> Result<Option<Span>, DocumentError> {
        if pattern.is_empty() {
            return Ok(None);
        }
        let regex = self.regex(pattern, flags)?;
        let from = char_to_byte(haystack, start);
        let found = match direction {
            Direction::Forward => regex.find_at(haystack, from),
            Direction::Backward => last_match_before(regex, haystack, from),
        };
        Ok(found.map(|m| {
            let s = byte_to_char(haystack, m.start());
            let e = s + haystack[m.start()..m.end()].chars().count();
            (s, e)
        }))
    }

    fn validate(&mut self, pattern: &str, flags: FindFlags) -> Result<(), DocumentError> {
        self.regex(pattern, flags).map(|_| ())
    }

    fn replace_all(
        &mut self,
        haystack: &str,
        pattern: &str,
        replacement: &str,
        flags: FindFlags,
    ) -> Result<(String, usize), DocumentError> {
        if pattern.is_empty() {
            return Ok((haystack.to_string(), 0));
        }
        let regex = self.regex(pattern, flags)?;
        let count = regex.find_iter(haystack).count();
        if count == 0 {
            return Ok((haystack.to_string(), 0));
        }
        let replaced = if flags.contains(FindFlags::REGEX) {
            regex.replace_all(haystack, replacement)
        } else {
            regex.replace_all(haystack, NoExpand(replacement))
        };
        Ok((replaced.into_owned(), count))
    }
}

/// The match ending at or before byte `limit` that starts last, overlaps
/// included. Each candidate start is tried in turn.
fn last_match_before<'h>(
    regex: &Regex,
    haystack: &'h str,
    limit: usize,
) -> Option<regex::Match<'h>> {
    let mut best = None;
    let mut at = 0;
    while at <= limit {
        let Some(m) = regex.find_at(haystack, at) else {
            break;
        };
        if m.start() > limit {
            break;
        }
        if m.end() <= limit {
            best = Some(m);
        }
        at = match haystack[m.start()..].chars().next() {
            Some(ch) => m.start() + ch.len_utf8(),
            None => break,
        };
    }
    best
}

/// Byte index of char offset `offset`, clamped to the string length.
pub(crate) fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(byte, _)| byte)
}

pub(crate) fn byte_to_char(text: &str, byte: usize) -> usize {
    text[..byte.min(text.len())].chars().count()
}
