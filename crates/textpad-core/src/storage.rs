/// Text storage backing a document, with a rope-based implementation.
///
/// All offsets are char offsets into the internal `\r\n` text.
use std::fmt;

use ropey::Rope;
use textpad_mod_history::UndoTarget;

/// Characters that terminate a line in storage. The rope counts only CR
/// and LF as line breaks.
const LINE_BREAK_CHARS: &[char] = &['\r', '\n'];

/// The character store and selection a document edits.
///
/// Undo states replay themselves through the [`UndoTarget`] half.
pub trait TextStorage: UndoTarget + Send {
    /// The full text.
    fn text(&self) -> String;
    /// Replaces the whole text and puts the caret at the start.
    fn set_text(&mut self, text: &str);
    fn len_chars(&self) -> usize;
    /// Current selection as `(start, end)`, `start <= end`.
    fn selection(&self) -> (usize, usize);
    /// Text of `[start, end)`, clamped to the content.
    fn substring(&self, start: usize, end: usize) -> String;
    /// Number of lines; an empty text has one line.
    fn line_count(&self) -> usize;
    /// Char offset where `line` starts. Lines past the end map to the text length.
    fn line_start(&self, line: usize) -> usize;
    /// Line holding the char at `offset`.
    fn line_of_offset(&self, offset: usize) -> usize;
    /// Text of `line` without its terminator, optionally cut at the
    /// absolute char offset `upto`.
    fn line(&self, line: usize, upto: Option<usize>) -> String;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Char offset just past the last non-terminator char of `line`.
    fn line_end(&self, line: usize) -> usize {
        self.line_start(line) + self.line(line, None).chars().count()
    }
}

/// A [`TextStorage`] backed by a rope data structure.
#[derive(Debug, Clone, Default)]
pub struct RopeStorage {
    rope: Rope,
    selection: (usize, usize),
}

impl From<&str> for RopeStorage {
    fn from(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selection: (0, 0),
        }
    }
}

impl fmt::Display for RopeStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rope)
    }
}

impl RopeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the underlying rope (read-only).
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    fn clamp(&self, offset: usize) -> usize {
        offset.min(self.rope.len_chars())
    }
}

impl UndoTarget for RopeStorage {
    fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        if end > start {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }
        let len = self.rope.len_chars();
        self.selection = (self.selection.0.min(len), self.selection.1.min(len));
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        let (a, b) = (self.clamp(start), self.clamp(end));
        self.selection = (a.min(b), a.max(b));
    }
}

impl TextStorage for RopeStorage {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.selection = (0, 0);
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn selection(&self) -> (usize, usize) {
        self.selection
    }

    fn substring(&self, start: usize, end: usize) -> String {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        self.rope.slice(start..end).to_string()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_start(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line)
    }

    fn line_of_offset(&self, offset: usize) -> usize {
        self.rope.char_to_line(self.clamp(offset))
    }

    fn line(&self, line: usize, upto: Option<usize>) -> String {
        if line >= self.rope.len_lines() {
            return String::new();
        }
        let start = self.rope.line_to_char(line);
        let mut text = self.rope.line(line).to_string();
        let trimmed = text.trim_end_matches(LINE_BREAK_CHARS).len();
        text.truncate(trimmed);
        if let Some(upto) = upto {
            let keep = upto.saturating_sub(start);
            if let Some((byte, _)) = text.char_indices().nth(keep) {
                text.truncate(byte);
            }
        }
        text
    }
}
