/// Indent style configuration, detection and re-indentation.
use serde::{Deserialize, Serialize};

/// Largest indentation mode accepted by setters and config values.
pub const MAX_INDENT_MODE: usize = 8;

/// Indentation style for a document.
///
/// The numeric mode used in settings maps 0 to tabs and N to N spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndentStyle {
    /// Use N spaces for indentation.
    Spaces(usize),
    /// Use a tab character for indentation.
    Tabs,
}

impl Default for IndentStyle {
    fn default() -> Self {
        Self::Tabs
    }
}

impl std::fmt::Display for IndentStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spaces(n) => write!(f, "Spaces: {n}"),
            Self::Tabs => write!(f, "Tabs"),
        }
    }
}

impl IndentStyle {
    /// Style for a numeric mode, `None` when out of range.
    pub fn from_mode(mode: usize) -> Option<Self> {
        match mode {
            0 => Some(Self::Tabs),
            n if n <= MAX_INDENT_MODE => Some(Self::Spaces(n)),
            _ => None,
        }
    }

    pub fn mode(&self) -> usize {
        match self {
            Self::Spaces(n) => *n,
            Self::Tabs => 0,
        }
    }

    /// Returns the string to insert for one level of indentation.
    pub fn indent_text(&self) -> String {
        match self {
            Self::Spaces(n) => " ".repeat(*n),
            Self::Tabs => "\t".to_string(),
        }
    }

    /// Returns the number of characters that one indent level represents.
    pub fn indent_size(&self) -> usize {
        match self {
            Self::Spaces(n) => (*n).max(1),
            Self::Tabs => 1,
        }
    }
}

fn is_indent_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Number of leading space/tab characters of `line`.
pub fn leading_indent_len(line: &str) -> usize {
    line.chars().take_while(|c| is_indent_char(*c)).count()
}

/// The leading spaces and tabs of `line`.
pub fn leading_indent(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| !is_indent_char(*c))
        .map_or(line.len(), |(i, _)| i);
    &line[..end]
}

/// Indent level of a line: indent characters divided by the unit size.
pub fn indent_level(line: &str, style: IndentStyle) -> usize {
    leading_indent_len(line) / style.indent_size()
}

/// Records an indent delta into the histogram if it's in range.
fn record_indent_delta(delta_counts: &mut [usize; 9], prev: usize, current: usize) {
    let delta = prev.abs_diff(current);
    if delta > 0 && delta < delta_counts.len() {
        delta_counts[delta] += 1;
    }
}

/// Picks the best standard indent width from the observed delta histogram.
fn best_standard_width(delta_counts: &[usize; 9]) -> Option<IndentStyle> {
    [2usize, 4, 8]
        .into_iter()
        .filter(|&w| delta_counts[w] > 0)
        .max_by_key(|&w| delta_counts[w])
        .map(IndentStyle::Spaces)
}

/// Detects the indentation style by scanning the first 100 lines of text.
///
/// Compares consecutive lines to find the most common indent-level delta,
/// then picks the standard width (2, 4, or 8) that explains it. Returns
/// `None` when the text carries no usable indentation.
pub fn detect_indent(text: &str) -> Option<IndentStyle> {
    let mut tab_lines = 0usize;
    let mut space_lines = 0usize;
    let mut delta_counts = [0usize; 9];
    let mut prev_indent: Option<usize> = None;

    for line in text.lines().take(100) {
        let leading = line.chars().next().unwrap_or(' ');
        match leading {
            '\t' => {
                tab_lines += 1;
                prev_indent = None;
            }
            ' ' if !line.trim().is_empty() => {
                space_lines += 1;
                let spaces = line.chars().take_while(|c| *c == ' ').count();
                if let Some(prev) = prev_indent {
                    record_indent_delta(&mut delta_counts, prev, spaces);
                }
                prev_indent = Some(spaces);
            }
            _ if !line.trim().is_empty() => {
                if let Some(prev) = prev_indent {
                    record_indent_delta(&mut delta_counts, prev, 0);
                }
                prev_indent = Some(0);
            }
            _ => {}
        }
    }

    if tab_lines == 0 && space_lines == 0 {
        return None;
    }
    if tab_lines > space_lines {
        return Some(IndentStyle::Tabs);
    }

    best_standard_width(&delta_counts)
}

/// Rewrites the leading indentation of every line from `old` units to
/// `new` units. Partial units are dropped. `\r\n` separators are kept.
pub fn reindent(text: &str, old: IndentStyle, new: IndentStyle) -> String {
    let unit = new.indent_text();
    text.split('\n')
        .map(|line| {
            let indent = leading_indent(line);
            let count = indent.chars().count() / old.indent_size();
            format!("{}{}", unit.repeat(count), &line[indent.len()..])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Adds one indent unit in front of every line of `block`.
pub fn indent_block(block: &str, style: IndentStyle) -> String {
    let unit = style.indent_text();
    block
        .split('\n')
        .map(|line| format!("{unit}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes one indent unit from the front of every line of `block` that
/// starts with one.
pub fn unindent_block(block: &str, style: IndentStyle) -> String {
    let unit = style.indent_text();
    block
        .split('\n')
        .map(|line| line.strip_prefix(unit.as_str()).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prepares clipboard text for pasting on a line indented with `indent`.
///
/// Line breaks become `\r\n`. The indentation common to all non-blank
/// lines after the first is replaced by `indent`, so a copied block keeps
/// its inner structure but lines up with the paste location. The first
/// line is inserted at the caret and is left alone.
pub fn prepare_smart_paste(text: &str, indent: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    if lines.len() < 2 {
        return normalized;
    }

    let common = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_indent(l))
        .reduce(|a, b| common_prefix(a, b))
        .unwrap_or("");

    let mut out = String::with_capacity(normalized.len() + lines.len() * (indent.len() + 1));
    out.push_str(lines[0]);
    for line in &lines[1..] {
        out.push_str("\r\n");
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(indent);
        out.push_str(line.strip_prefix(common).unwrap_or(line));
    }
    out
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── IndentStyle basics ─────────────────────────────────────────────

    #[test]
    fn test_mode_mapping() {
        assert_eq!(IndentStyle::from_mode(0), Some(IndentStyle::Tabs));
        assert_eq!(IndentStyle::from_mode(4), Some(IndentStyle::Spaces(4)));
        assert_eq!(IndentStyle::from_mode(9), None);
        assert_eq!(IndentStyle::Spaces(2).mode(), 2);
        assert_eq!(IndentStyle::Tabs.mode(), 0);
    }

    #[test]
    fn test_indent_text() {
        assert_eq!(IndentStyle::Spaces(2).indent_text(), "  ");
        assert_eq!(IndentStyle::Tabs.indent_text(), "\t");
    }

    #[test]
    fn test_display() {
        assert_eq!(IndentStyle::Spaces(4).to_string(), "Spaces: 4");
        assert_eq!(IndentStyle::Tabs.to_string(), "Tabs");
    }

    #[test]
    fn test_indent_level() {
        assert_eq!(indent_level("        x", IndentStyle::Spaces(4)), 2);
        assert_eq!(indent_level("\t\tx", IndentStyle::Tabs), 2);
        assert_eq!(indent_level("   x", IndentStyle::Spaces(4)), 0);
        assert_eq!(indent_level("    ", IndentStyle::Spaces(2)), 2);
    }

    #[test]
    fn test_leading_indent() {
        assert_eq!(leading_indent(" \t x"), " \t ");
        assert_eq!(leading_indent("x"), "");
        assert_eq!(leading_indent_len("\t\t"), 2);
    }

    // ── detect_indent ──────────────────────────────────────────────────

    #[test]
    fn test_detect_nothing() {
        assert_eq!(detect_indent(""), None);
        assert_eq!(detect_indent("line1\nline2\n"), None);
    }

    #[test]
    fn test_detect_tabs_majority() {
        let text = "\ta\n\tb\n  c\n\td\n";
        assert_eq!(detect_indent(text), Some(IndentStyle::Tabs));
    }

    #[test]
    fn test_detect_spaces_4() {
        let text = "fn main() {\r\n    let x = 1;\r\n    if true {\r\n        inner();\r\n    }\r\n}\r\n";
        assert_eq!(detect_indent(text), Some(IndentStyle::Spaces(4)));
    }

    #[test]
    fn test_detect_spaces_2() {
        let text = "function() {\n  let x = 1;\n  if (true) {\n    inner();\n  }\n}\n";
        assert_eq!(detect_indent(text), Some(IndentStyle::Spaces(2)));
    }

    #[test]
    fn test_detect_odd_widths_is_ambiguous() {
        let text = "top\n   three\n      six\ntop\n";
        assert_eq!(detect_indent(text), None);
    }

    // ── reindent / block indent ────────────────────────────────────────

    #[test]
    fn test_reindent_spaces_to_tabs() {
        let text = "a\r\n    b\r\n        c\r\n      d";
        assert_eq!(
            reindent(text, IndentStyle::Spaces(4), IndentStyle::Tabs),
            "a\r\n\tb\r\n\t\tc\r\n\td"
        );
    }

    #[test]
    fn test_reindent_tabs_to_spaces() {
        assert_eq!(
            reindent("\tx\n\t\ty", IndentStyle::Tabs, IndentStyle::Spaces(2)),
            "  x\n    y"
        );
    }

    #[test]
    fn test_indent_and_unindent_block() {
        let block = "a\r\n  b";
        let indented = indent_block(block, IndentStyle::Spaces(2));
        assert_eq!(indented, "  a\r\n    b");
        assert_eq!(unindent_block(&indented, IndentStyle::Spaces(2)), block);
        assert_eq!(unindent_block("x\r\n\ty", IndentStyle::Tabs), "x\r\ny");
    }

    // ── smart paste ────────────────────────────────────────────────────

    #[test]
    fn test_smart_paste_single_line_untouched() {
        assert_eq!(prepare_smart_paste("  hello", "\t"), "  hello");
    }

    #[test]
    fn test_smart_paste_realigns_block() {
        let clip = "if x {\n        y();\n    }\n";
        assert_eq!(
            prepare_smart_paste(clip, "\t"),
            "if x {\r\n\t    y();\r\n\t}\r\n"
        );
    }

    #[test]
    fn test_smart_paste_blank_lines_get_no_indent() {
        assert_eq!(prepare_smart_paste("a\r\n\r\n  b", "  "), "a\r\n\r\n  b");
    }
}
