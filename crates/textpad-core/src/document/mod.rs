//! Document model: text storage, format attributes, flags and lifecycle.
//!
//! A `Document` ties together a [`TextStorage`], its undo history and the
//! format parameters the file is read and written with. Editing operations
//! live in the `editing` submodule, find/replace in `find`, and file I/O in
//! `io`. Operations that raise events or touch the file system take the
//! owning [`Session`](crate::session::Session) (or its event registry) as a
//! parameter.

mod editing;
mod find;
mod io;

pub use io::{DiskIo, FileIo};

use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use chrono::{DateTime, Local};
use textpad_config::ResolvedConfig;

use crate::encoding::{LineEnding, TextEncoding};
use crate::events::{AttrChange, EventRegistry};
use crate::format::FormatParams;
use crate::history::UndoHistory;
use crate::indent::{indent_level, leading_indent_len, IndentStyle, MAX_INDENT_MODE};
use crate::storage::{RopeStorage, TextStorage};

/// Name shown for documents that were never saved.
pub const UNTITLED: &str = "Untitled";

/// Tab widths accepted by [`Document::set_tab_width`].
const TAB_WIDTH_RANGE: std::ops::RangeInclusive<usize> = 1..=8;

bitflags! {
    /// Per-document behavior switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DocumentFlags: u16 {
        const READ_ONLY = 1;
        /// Plain save is not allowed; a target path must be given.
        const MUST_SAVE_AS = 1 << 1;
        const NO_RELOAD = 1 << 2;
        const NO_SAVE = 1 << 3;
        /// The serialized content goes to stdout when the document closes.
        const WRITE_TO_STDOUT = 1 << 4;
        const AUTO_LINE_BREAK = 1 << 5;
        const NO_AUTO_INDENT = 1 << 6;
        const NO_SMART_HOME = 1 << 7;
        const NO_SAFE_INDENT = 1 << 8;
        const NO_SMART_PASTE = 1 << 9;
        const TRIM_TRAILING_WHITESPACE = 1 << 10;
        const INSERT_FINAL_NEWLINE = 1 << 11;
    }
}

/// Lifecycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocState {
    #[default]
    Unloaded,
    Loading,
    /// Loaded and unchanged since.
    Ready,
    Modified,
    /// Written to disk and unchanged since.
    Saved,
    Closed,
}

/// What to do with unsaved changes when closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Save,
    Discard,
    Cancel,
}

/// A single document with its storage, history and format metadata.
pub struct Document {
    name: String,
    path: Option<PathBuf>,
    /// Format parameters; `None` until loaded or set.
    params: FormatParams,
    flags: DocumentFlags,
    state: DocState,
    last_saved: Option<DateTime<Local>>,
    /// Cascade values resolved at the last load or save-as.
    resolved_config: Option<ResolvedConfig>,
    storage: Box<dyn TextStorage>,
    history: UndoHistory,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("flags", &self.flags)
            .field("state", &self.state)
            .field("len_chars", &self.storage.len_chars())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty, unsaved document backed by a rope.
    pub fn new() -> Self {
        Self::with_storage(Box::new(RopeStorage::new()), UndoHistory::default())
    }

    /// Creates an empty document over the given storage and history.
    pub fn with_storage(storage: Box<dyn TextStorage>, history: UndoHistory) -> Self {
        Self {
            name: UNTITLED.to_string(),
            path: None,
            params: FormatParams::default(),
            flags: DocumentFlags::empty(),
            state: DocState::Unloaded,
            last_saved: None,
            resolved_config: None,
            storage,
            history,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn state(&self) -> DocState {
        self.state
    }

    pub fn is_modified(&self) -> bool {
        self.state == DocState::Modified
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(DocumentFlags::READ_ONLY)
    }

    pub fn flags(&self) -> DocumentFlags {
        self.flags
    }

    /// Turns `flag` on or off without raising events.
    pub fn set_flag(&mut self, flag: DocumentFlags, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        self.last_saved
    }

    pub fn encoding(&self) -> TextEncoding {
        self.params.encoding.unwrap_or_default()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.params.line_ending.unwrap_or_default()
    }

    /// Indentation mode: 0 for tabs, N for N spaces.
    pub fn indentation(&self) -> usize {
        self.params.indentation.unwrap_or(0)
    }

    pub fn indent_style(&self) -> IndentStyle {
        IndentStyle::from_mode(self.indentation()).unwrap_or_default()
    }

    pub fn tab_width(&self) -> usize {
        self.params.tab_width.unwrap_or(8)
    }

    /// The format parameters as set so far.
    pub fn format_params(&self) -> FormatParams {
        self.params
    }

    /// Cascade values resolved at the last load or save-as, if any.
    pub fn resolved_config(&self) -> Option<&ResolvedConfig> {
        self.resolved_config.as_ref()
    }

    pub fn storage(&self) -> &dyn TextStorage {
        self.storage.as_ref()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn text(&self) -> String {
        self.storage.text()
    }

    pub fn selection(&self) -> (usize, usize) {
        self.storage.selection()
    }

    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.storage.set_selection(start, end);
    }

    /// The selected text, or `None` when the selection is empty.
    pub fn selected_text(&self) -> Option<String> {
        let (start, end) = self.storage.selection();
        (start != end).then(|| self.storage.substring(start, end))
    }

    /// Replaces the whole content without recording history.
    ///
    /// Used for freshly created documents; the history is cleared.
    pub fn set_text(&mut self, text: &str) {
        self.storage.set_text(text);
        self.history.clear();
        self.mark_modified();
    }

    pub(crate) fn mark_modified(&mut self) {
        if self.state != DocState::Closed {
            self.state = DocState::Modified;
        }
    }

    // ── Attribute setters ────────────────────────────────────────────

    pub fn set_name(&mut self, events: &mut EventRegistry, name: impl Into<String>) {
        self.name = name.into();
        let change = AttrChange::Name(self.name.clone());
        events.emit_attr_change(self, &change);
    }

    pub fn set_encoding(&mut self, events: &mut EventRegistry, encoding: TextEncoding) {
        self.params.encoding = Some(encoding);
        events.emit_attr_change(self, &AttrChange::Encoding(encoding));
    }

    pub fn set_line_ending(&mut self, events: &mut EventRegistry, ending: LineEnding) {
        self.params.line_ending = Some(ending);
        events.emit_attr_change(self, &AttrChange::LineEnding(ending));
    }

    /// Sets the line ending by numeric id (0 = CRLF ... 4 = LS).
    ///
    /// Returns `false` and changes nothing for an unknown id.
    pub fn set_line_ending_id(&mut self, events: &mut EventRegistry, id: u8) -> bool {
        match LineEnding::from_id(id) {
            Some(ending) => {
                self.set_line_ending(events, ending);
                true
            }
            None => false,
        }
    }

    /// Sets the indentation mode (0 = tabs, 1..=8 spaces).
    ///
    /// Returns `false` and changes nothing when out of range.
    pub fn set_indentation_mode(&mut self, events: &mut EventRegistry, mode: usize) -> bool {
        if mode > MAX_INDENT_MODE {
            return false;
        }
        self.params.indentation = Some(mode);
        events.emit_attr_change(self, &AttrChange::Indentation(mode));
        true
    }

    /// Sets the tab display width (1..=8).
    ///
    /// Returns `false` and changes nothing when out of range.
    pub fn set_tab_width(&mut self, events: &mut EventRegistry, width: usize) -> bool {
        if !TAB_WIDTH_RANGE.contains(&width) {
            return false;
        }
        self.params.tab_width = Some(width);
        events.emit_attr_change(self, &AttrChange::TabWidth(width));
        true
    }

    /// Toggles automatic line wrapping. No event when the value is unchanged.
    pub fn set_auto_line_break(&mut self, events: &mut EventRegistry, on: bool) {
        if self.flags.contains(DocumentFlags::AUTO_LINE_BREAK) == on {
            return;
        }
        self.flags.set(DocumentFlags::AUTO_LINE_BREAK, on);
        events.emit_attr_change(self, &AttrChange::AutoLineBreak(on));
    }

    pub fn set_read_only(&mut self, events: &mut EventRegistry, on: bool) {
        self.flags.set(DocumentFlags::READ_ONLY, on);
        events.emit_attr_change(self, &AttrChange::ReadOnly(on));
    }

    /// Sets every parameter of `params` that differs from the current value,
    /// raising one event per change.
    pub(crate) fn apply_params(&mut self, events: &mut EventRegistry, params: FormatParams) {
        if let Some(ending) = params.line_ending.filter(|e| Some(*e) != self.params.line_ending) {
            self.set_line_ending(events, ending);
        }
        if let Some(encoding) = params.encoding.filter(|e| Some(*e) != self.params.encoding) {
            self.set_encoding(events, encoding);
        }
        if let Some(mode) = params.indentation.filter(|m| Some(*m) != self.params.indentation) {
            self.set_indentation_mode(events, mode);
        }
        if let Some(width) = params.tab_width.filter(|w| Some(*w) != self.params.tab_width) {
            self.set_tab_width(events, width);
        }
    }

    /// Applies the behavior switches a cascade may carry.
    pub(crate) fn apply_config_flags(&mut self, config: &ResolvedConfig) {
        // (key, flag, flag set when the key is true)
        const SWITCHES: [(&str, DocumentFlags, bool); 7] = [
            ("textpad_auto_indent", DocumentFlags::NO_AUTO_INDENT, false),
            ("textpad_auto_line_break", DocumentFlags::AUTO_LINE_BREAK, true),
            ("textpad_smart_home", DocumentFlags::NO_SMART_HOME, false),
            ("textpad_safe_indent", DocumentFlags::NO_SAFE_INDENT, false),
            ("textpad_smart_paste", DocumentFlags::NO_SMART_PASTE, false),
            (
                "trim_trailing_whitespace",
                DocumentFlags::TRIM_TRAILING_WHITESPACE,
                true,
            ),
            ("insert_final_newline", DocumentFlags::INSERT_FINAL_NEWLINE, true),
        ];
        for (key, flag, set_when) in SWITCHES {
            if let Some(value) = config.get_bool(key) {
                self.flags.set(flag, value == set_when);
            }
        }
    }

    // ── Line queries ─────────────────────────────────────────────────

    /// Indent level of `line`: leading indent chars divided by the indent unit.
    pub fn line_indent_level(&self, line: usize) -> usize {
        indent_level(&self.storage.line(line, None), self.indent_style())
    }

    /// Offset of the first non-indent char of `line` (the smart-home target).
    pub fn line_safe_start(&self, line: usize) -> usize {
        self.storage.line_start(line) + leading_indent_len(&self.storage.line(line, None))
    }

    /// Where the caret should go on Home. With smart home, the first press
    /// goes to the end of the indentation and a second one to column 0.
    pub fn home_position(&self) -> usize {
        let (caret, _) = self.storage.selection();
        let line = self.storage.line_of_offset(caret);
        let start = self.storage.line_start(line);
        if self.flags.contains(DocumentFlags::NO_SMART_HOME) {
            return start;
        }
        let safe = self.line_safe_start(line);
        if caret == safe {
            start
        } else {
            safe
        }
    }

    // ── Status and navigation ────────────────────────────────────────

    /// Status line text, passed through the status hooks.
    ///
    /// `Li 1, Col 1.\t0%, 3 lines` for a caret, or
    /// `Li 1, Col 1 to Li 2, Col 4` for a selection.
    pub fn status_text(&self, events: &mut EventRegistry) -> String {
        let (start, end) = self.storage.selection();
        let (sline, scol) = self.line_col(start);
        let text = if start != end {
            let (eline, ecol) = self.line_col(end);
            format!(
                "Li {}, Col {} to Li {}, Col {}",
                sline + 1,
                scol + 1,
                eline + 1,
                ecol + 1
            )
        } else {
            let len = self.storage.len_chars();
            let percent = if len > 0 { 100 * start / len } else { 0 };
            format!(
                "Li {}, Col {}.\t{}%, {} lines",
                sline + 1,
                scol + 1,
                percent,
                self.storage.line_count()
            )
        };
        events.emit_status(self, text)
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.storage.line_of_offset(offset);
        (line, offset - self.storage.line_start(line).min(offset))
    }

    /// Moves the caret to the start of the line described by `input`.
    ///
    /// `input` is a 1-based line number, or `+N` / `-N` relative to the
    /// caret line. The result is clamped to the document. Returns the
    /// 0-based target line, or `None` if `input` is not a number.
    pub fn go_to_line(&mut self, input: &str) -> Option<usize> {
        let (caret, _) = self.storage.selection();
        let current = self.storage.line_of_offset(caret);
        let line = resolve_line(input, current, self.storage.line_count())?;
        let pos = self.storage.line_start(line);
        self.storage.set_selection(pos, pos);
        Some(line)
    }
}

/// Resolves a go-to-line request against a document of `line_count` lines.
pub fn resolve_line(input: &str, current: usize, line_count: usize) -> Option<usize> {
    let input = input.trim();
    let number: i64 = input.parse().ok()?;
    let target = if input.starts_with('+') || input.starts_with('-') {
        i64::try_from(current).unwrap_or(i64::MAX).saturating_add(number)
    } else {
        number.saturating_sub(1)
    };
    let last = i64::try_from(line_count.saturating_sub(1)).unwrap_or(i64::MAX);
    Some(target.clamp(0, last) as usize)
}

/// Display name for a document stored at `path`.
pub(crate) fn name_for_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNTITLED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn doc_with(text: &str) -> Document {
        let mut doc = Document::new();
        doc.set_text(text);
        doc
    }

    // ── construction ─────────────────────────────────────────────────

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new();
        assert_eq!(doc.name(), "Untitled");
        assert!(doc.path().is_none());
        assert_eq!(doc.state(), DocState::Unloaded);
        assert!(!doc.is_modified());
        assert_eq!(doc.indent_style(), IndentStyle::Tabs);
        assert_eq!(doc.tab_width(), 8);
        assert!(doc.flags().is_empty());
    }

    // ── attribute setters ────────────────────────────────────────────

    #[test]
    fn test_setters_validate_and_emit() {
        let mut events = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.on_attr_change(move |_, change| sink.lock().unwrap().push(change.clone()));

        let mut doc = Document::new();
        assert!(doc.set_tab_width(&mut events, 4));
        assert!(!doc.set_tab_width(&mut events, 0));
        assert!(!doc.set_tab_width(&mut events, 9));
        assert!(doc.set_indentation_mode(&mut events, 8));
        assert!(!doc.set_indentation_mode(&mut events, 9));
        assert!(doc.set_line_ending_id(&mut events, 1));
        assert!(!doc.set_line_ending_id(&mut events, 5));

        assert_eq!(doc.tab_width(), 4);
        assert_eq!(doc.indentation(), 8);
        assert_eq!(doc.line_ending(), LineEnding::Lf);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                AttrChange::TabWidth(4),
                AttrChange::Indentation(8),
                AttrChange::LineEnding(LineEnding::Lf),
            ]
        );
    }

    #[test]
    fn test_auto_line_break_only_emits_on_change() {
        let mut events = EventRegistry::new();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        events.on_attr_change(move |_, _| *sink.lock().unwrap() += 1);

        let mut doc = Document::new();
        doc.set_auto_line_break(&mut events, false);
        doc.set_auto_line_break(&mut events, true);
        doc.set_auto_line_break(&mut events, true);
        assert!(doc.flags().contains(DocumentFlags::AUTO_LINE_BREAK));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_config_flags() {
        let source = textpad_config::EditorConfigFile::parse(
            "[*]\ntextpad_auto_indent = false\ntextpad_smart_paste = true\ninsert_final_newline = true\n",
            "/p",
        );
        let cascade = textpad_config::ConfigCascade::from_sources(Path::new("/p/a.txt"), vec![source]);
        let mut doc = Document::new();
        doc.set_flag(DocumentFlags::NO_SMART_PASTE, true);
        doc.apply_config_flags(&cascade.resolved());
        assert!(doc.flags().contains(DocumentFlags::NO_AUTO_INDENT));
        assert!(!doc.flags().contains(DocumentFlags::NO_SMART_PASTE));
        assert!(doc.flags().contains(DocumentFlags::INSERT_FINAL_NEWLINE));
    }

    // ── line queries ─────────────────────────────────────────────────

    #[test]
    fn test_line_indent_level_and_safe_start() {
        let mut events = EventRegistry::new();
        let mut doc = doc_with("a\r\n        b\r\n    ");
        doc.set_indentation_mode(&mut events, 4);
        assert_eq!(doc.line_indent_level(0), 0);
        assert_eq!(doc.line_indent_level(1), 2);
        assert_eq!(doc.line_safe_start(1), 3 + 8);
        // A whitespace-only line's safe start is its end.
        assert_eq!(doc.line_safe_start(2), 14 + 4);
    }

    #[test]
    fn test_home_position_toggles() {
        let mut doc = doc_with("x\r\n\t\tfoo");
        doc.set_selection(8, 8);
        assert_eq!(doc.home_position(), 5);
        doc.set_selection(5, 5);
        assert_eq!(doc.home_position(), 3);
        doc.set_flag(DocumentFlags::NO_SMART_HOME, true);
        doc.set_selection(8, 8);
        assert_eq!(doc.home_position(), 3);
    }

    // ── status / go to line ──────────────────────────────────────────

    #[test]
    fn test_status_text_caret_and_range() {
        let mut events = EventRegistry::new();
        let mut doc = doc_with("abc\r\ndef\r\nghi");
        assert_eq!(doc.status_text(&mut events), "Li 1, Col 1.\t0%, 3 lines");
        doc.set_selection(6, 6);
        assert_eq!(doc.status_text(&mut events), "Li 2, Col 2.\t46%, 3 lines");
        doc.set_selection(1, 7);
        assert_eq!(doc.status_text(&mut events), "Li 1, Col 2 to Li 2, Col 3");
    }

    #[test]
    fn test_status_hook_overrides() {
        let mut events = EventRegistry::new();
        events.on_status(|_, text| Some(format!("[{text}]")));
        let doc = Document::new();
        assert_eq!(doc.status_text(&mut events), "[Li 1, Col 1.\t0%, 1 lines]");
    }

    #[test]
    fn test_resolve_line() {
        assert_eq!(resolve_line("1", 5, 10), Some(0));
        assert_eq!(resolve_line("4", 0, 10), Some(3));
        assert_eq!(resolve_line("+2", 5, 10), Some(7));
        assert_eq!(resolve_line("-9", 5, 10), Some(0));
        assert_eq!(resolve_line("99", 0, 10), Some(9));
        assert_eq!(resolve_line("0", 3, 10), Some(0));
        assert_eq!(resolve_line("abc", 0, 10), None);
    }

    #[test]
    fn test_resolve_line_extreme_numbers_clamp() {
        assert_eq!(resolve_line("+9223372036854775807", 1, 3), Some(2));
        assert_eq!(resolve_line("-9223372036854775808", 1, 3), Some(0));
        assert_eq!(resolve_line("-9223372036854775808", 0, 3), Some(0));
        assert_eq!(resolve_line("9223372036854775807", 0, 3), Some(2));
    }

    #[test]
    fn test_go_to_line_moves_caret() {
        let mut doc = doc_with("a\r\nb\r\nc");
        assert_eq!(doc.go_to_line("3"), Some(2));
        assert_eq!(doc.selection(), (6, 6));
        assert_eq!(doc.go_to_line("-1"), Some(1));
        assert_eq!(doc.selection(), (3, 3));
    }
}
