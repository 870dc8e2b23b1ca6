//! Editorconfig-style glob patterns, compiled to regular expressions.
//!
//! Paths are matched relative to the directory of the config file that
//! declared the pattern, using `/` as the separator. A pattern without a `/`
//! matches the file name in any subdirectory.

use regex::Regex;

/// Upper bound on the size of an expanded `{n..m}` numeric range.
const MAX_RANGE_EXPANSION: u64 = 1000;

/// A compiled glob pattern. Construction never fails.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    /// Fallback when the translated pattern is rejected by the regex engine.
    Literal(String),
}

impl GlobPattern {
    /// Compiles `glob`. Fragments that cannot be translated are matched
    /// literally; if the whole translation is rejected by the regex engine,
    /// the pattern falls back to a literal file-name match.
    pub fn new(glob: &str) -> Self {
        let translated = glob_to_regex(glob);
        let matcher = match Regex::new(&translated) {
            Ok(regex) => Matcher::Regex(regex),
            Err(e) => {
                tracing::debug!("glob {glob:?} compiled to invalid regex ({e}), matching literally");
                Matcher::Literal(glob.trim_start_matches('/').to_string())
            }
        };
        Self {
            source: glob.to_string(),
            matcher,
        }
    }

    /// The glob as written in the config file.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The translated regular expression, if the glob compiled.
    pub fn regex_str(&self) -> Option<&str> {
        match &self.matcher {
            Matcher::Regex(regex) => Some(regex.as_str()),
            Matcher::Literal(_) => None,
        }
    }

    /// Tests a `/`-separated path relative to the declaring directory.
    pub fn matches(&self, relative_path: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(regex) => regex.is_match(relative_path),
            Matcher::Literal(literal) => {
                relative_path == literal || relative_path.ends_with(&format!("/{literal}"))
            }
        }
    }
}

fn case_prefix() -> &'static str {
    if cfg!(windows) {
        "(?i)"
    } else {
        ""
    }
}

/// Translates a glob to an anchored regular expression.
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let (body_chars, anchored) = if let Some(rest) = chars.strip_prefix(&['/']) {
        (rest, true)
    } else {
        (&chars[..], chars.contains(&'/'))
    };
    let body = translate(body_chars);
    if anchored {
        format!("{}^{body}$", case_prefix())
    } else {
        format!("{}^(?:.*/)?{body}$", case_prefix())
    }
}

fn translate(chars: &[char]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\\' => {
                match chars.get(i + 1) {
                    Some(next) => out.push_str(&regex::escape(&next.to_string())),
                    None => out.push_str(r"\\"),
                }
                i += 2;
                continue;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                if let Some((class, consumed)) = bracket_class(&chars[i..]) {
                    out.push_str(&class);
                    i += consumed;
                    continue;
                }
                out.push_str(r"\[");
            }
            '{' => {
                if let Some((group, consumed)) = brace_group(&chars[i..]) {
                    out.push_str(&group);
                    i += consumed;
                    continue;
                }
                out.push_str(r"\{");
            }
            // Not valid in file names.
            '#' | '|' | '&' | '<' | '>' => {}
            _ => out.push_str(&regex::escape(&ch.to_string())),
        }
        i += 1;
    }
    out
}

/// Translates a `[...]` class starting at `chars[0]`. Returns the regex class
/// and the number of glob chars consumed, or `None` when the bracket is not
/// closed on the same path segment.
fn bracket_class(chars: &[char]) -> Option<(String, usize)> {
    let mut i = 1;
    let mut class = String::from("[");
    if chars.get(i) == Some(&'!') {
        class.push('^');
        i += 1;
    }
    let content_start = i;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            ']' if i > content_start => {
                class.push(']');
                return Some((class, i + 1));
            }
            '/' => return None,
            '\\' => {
                let next = chars.get(i + 1)?;
                class.push('\\');
                class.push(*next);
                i += 2;
                continue;
            }
            '[' | '&' | '~' | '^' | ']' => {
                class.push('\\');
                class.push(ch);
            }
            _ => class.push(ch),
        }
        i += 1;
    }
    None
}

/// Translates a `{a,b}` alternation or `{n..m}` range starting at `chars[0]`.
fn brace_group(chars: &[char]) -> Option<(String, usize)> {
    let mut depth = 0usize;
    let mut close = None;
    for (idx, ch) in chars.iter().enumerate() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close?;
    let inner = &chars[1..close];

    if let Some(range) = numeric_range(inner) {
        return Some((range, close + 1));
    }

    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in inner.iter().enumerate() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                alternatives.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    alternatives.push(&inner[start..]);

    if alternatives.len() == 1 {
        // `{single}` is literal text.
        let text: String = inner.iter().collect();
        return Some((format!(r"\{{{}\}}", regex::escape(&text)), close + 1));
    }

    let translated: Vec<String> = alternatives.into_iter().map(translate).collect();
    Some((format!("(?:{})", translated.join("|")), close + 1))
}

fn numeric_range(inner: &[char]) -> Option<String> {
    let text: String = inner.iter().collect();
    let (lo, hi) = text.split_once("..")?;
    let lo: i64 = lo.parse().ok()?;
    let hi: i64 = hi.parse().ok()?;
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    if hi.abs_diff(lo) >= MAX_RANGE_EXPANSION {
        return Some(r"-?[0-9]+".to_string());
    }
    let options: Vec<String> = (lo..=hi).map(|n| n.to_string()).collect();
    Some(format!("(?:{})", options.join("|")))
}
