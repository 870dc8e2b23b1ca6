//! Editing operations. Every change to the text is recorded as an undo state.

use textpad_mod_history::{DeleteSelect, UndoState};

use crate::encoding::INTERNAL_EOL;
use crate::events::{Alert, EventRegistry, HookResult};
use crate::indent::{
    indent_block, leading_indent, leading_indent_len, prepare_smart_paste, reindent,
    unindent_block, IndentStyle,
};

use super::{Document, DocumentFlags};

/// Upper bound on extra indent levels an enter hook may request.
const MAX_HOOK_INDENT: i32 = 100;

/// How far past a line break forward delete looks for indentation to eat.
const DELETE_LOOKAHEAD: usize = 100;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Converts any mix of line breaks to `\r\n`.
fn normalize_eol(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', INTERNAL_EOL)
}

impl Document {
    fn refuse_if_read_only(&self, events: &mut EventRegistry) -> bool {
        if self.is_read_only() {
            events.alert(Alert::ReadOnly);
            true
        } else {
            false
        }
    }

    /// Removes the current selection, recording it so undo selects it again.
    /// Returns the caret position afterwards.
    fn delete_selection(&mut self) -> usize {
        let (start, end) = self.storage.selection();
        if start == end {
            return start;
        }
        let text = self.storage.substring(start, end);
        self.storage.replace_range(start, end, "");
        self.storage.set_selection(start, start);
        self.history
            .push_with(UndoState::deleted(start, text, DeleteSelect::Restored), false);
        start
    }

    /// Replaces the selection with `text` and leaves the caret after it.
    fn insert_at_selection(&mut self, text: &str, try_join: bool) {
        let pos = self.delete_selection();
        self.storage.replace_range(pos, pos, text);
        let caret = pos + char_len(text);
        self.storage.set_selection(caret, caret);
        self.history
            .push_with(UndoState::inserted(pos, text), try_join);
        self.mark_modified();
    }

    /// Types `text` at the caret, replacing the selection.
    ///
    /// Consecutive typing coalesces into one undo state.
    pub fn insert_text(&mut self, events: &mut EventRegistry, text: &str) -> bool {
        if text.is_empty() || self.refuse_if_read_only(events) {
            return false;
        }
        self.insert_at_selection(text, true);
        true
    }

    /// Breaks the line at the caret.
    ///
    /// The new line copies the indentation of the text before the caret
    /// unless auto-indent is off. Enter hooks may suppress that, add or
    /// remove indent levels, or append text.
    pub fn insert_newline(&mut self, events: &mut EventRegistry) -> bool {
        if self.refuse_if_read_only(events) {
            return false;
        }
        let (caret, _) = self.storage.selection();
        let line_no = self.storage.line_of_offset(caret);
        let line = self.storage.line(line_no, Some(caret));

        let (levels, extra) = match events.emit_enter(self, &line, line_no) {
            HookResult::Suppress => {
                self.insert_at_selection(INTERNAL_EOL, false);
                return true;
            }
            HookResult::OverrideIndent(n) => {
                (n.clamp(-MAX_HOOK_INDENT, MAX_HOOK_INDENT), String::new())
            }
            HookResult::OverrideText(text) => (0, text),
            HookResult::Continue => (0, String::new()),
        };

        let mut keep = if self.flags.contains(DocumentFlags::NO_AUTO_INDENT) {
            0
        } else {
            leading_indent_len(&line)
        };
        let style = self.indent_style();
        if levels < 0 {
            let remove = levels.unsigned_abs() as usize * style.indent_size();
            keep = keep.saturating_sub(remove);
        }
        let mut inserted = String::from(INTERNAL_EOL);
        inserted.extend(line.chars().take(keep));
        if levels > 0 {
            inserted.push_str(&style.indent_text().repeat(levels as usize));
        }
        inserted.push_str(&extra);

        self.insert_at_selection(&inserted, false);
        true
    }

    /// Deletes backwards from the caret.
    ///
    /// A `\r\n` pair goes as one unit. With safe indent on, a space or tab
    /// strictly inside the line's leading indentation is protected and an
    /// [`Alert::IndentProtected`] is raised instead. Returns whether text
    /// was removed.
    pub fn backspace(&mut self, events: &mut EventRegistry) -> bool {
        if self.refuse_if_read_only(events) {
            return false;
        }
        let (start, end) = self.storage.selection();
        if start != end {
            self.delete_selection();
            self.mark_modified();
            return true;
        }
        if start == 0 {
            return false;
        }

        let prev = self.storage.substring(start - 1, start);
        let after_crlf =
            prev == "\n" && start >= 2 && self.storage.substring(start - 2, start - 1) == "\r";
        let safe_indent = !self.flags.contains(DocumentFlags::NO_SAFE_INDENT);
        if !after_crlf && safe_indent && (prev == " " || prev == "\t") {
            let line = self.storage.line_of_offset(start);
            if start < self.line_safe_start(line) {
                events.alert(Alert::IndentProtected);
                return false;
            }
        }
        let from = if after_crlf { start - 2 } else { start - 1 };

        let text = self.storage.substring(from, start);
        self.storage.replace_range(from, start, "");
        self.storage.set_selection(from, from);
        self.history
            .push(UndoState::deleted(from, text, DeleteSelect::CaretAfter));
        self.mark_modified();
        true
    }

    /// Deletes forwards from the caret.
    ///
    /// At a line break the whole `\r\n` goes; with safe indent on, the
    /// indentation of the following line goes with it.
    pub fn delete_forward(&mut self, events: &mut EventRegistry) -> bool {
        if self.refuse_if_read_only(events) {
            return false;
        }
        let (start, end) = self.storage.selection();
        if start != end {
            self.delete_selection();
            self.mark_modified();
            return true;
        }
        if start >= self.storage.len_chars() {
            return false;
        }

        let count = if self.storage.substring(start, start + 1) == "\r" {
            if self.flags.contains(DocumentFlags::NO_SAFE_INDENT) {
                2
            } else {
                let ahead = self.storage.substring(start, start + DELETE_LOOKAHEAD);
                let chars: Vec<char> = ahead.chars().collect();
                match chars.iter().position(|c| !matches!(c, ' ' | '\t' | '\r' | '\n')) {
                    Some(3) if chars[2] == ' ' => 2,
                    Some(n) if n >= 2 => n,
                    _ => 2,
                }
            }
        } else {
            1
        };

        let text = self.storage.substring(start, start + count);
        let end = start + char_len(&text);
        self.storage.replace_range(start, end, "");
        self.storage.set_selection(start, start);
        self.history
            .push(UndoState::deleted(start, text, DeleteSelect::CaretAtStart));
        self.mark_modified();
        true
    }

    /// Pastes `clip` over the selection.
    ///
    /// With smart paste on, the pasted lines are re-indented to the
    /// indentation of the current line.
    pub fn paste(&mut self, events: &mut EventRegistry, clip: &str) -> bool {
        if clip.is_empty() || self.refuse_if_read_only(events) {
            return false;
        }
        let text = if self.flags.contains(DocumentFlags::NO_SMART_PASTE) {
            normalize_eol(clip)
        } else {
            let (caret, _) = self.storage.selection();
            let line = self.storage.line(self.storage.line_of_offset(caret), None);
            prepare_smart_paste(clip, leading_indent(&line))
        };
        self.insert_at_selection(&text, false);
        true
    }

    /// Replaces `[start, end)` with `text` as one undo step.
    ///
    /// The bounds may be given in either order. With `keep_selection` the
    /// previous selection is restored, otherwise the new text is selected.
    pub fn replace_range(
        &mut self,
        events: &mut EventRegistry,
        start: usize,
        end: usize,
        text: &str,
        keep_selection: bool,
    ) -> bool {
        if self.refuse_if_read_only(events) {
            return false;
        }
        let (start, end) = (start.min(end), start.max(end));
        let (old_start, old_end) = self.storage.selection();
        let old_text = self.storage.substring(start, end);
        self.storage.replace_range(start, end, text);
        if keep_selection {
            self.storage.set_selection(old_start, old_end);
        } else {
            self.storage.set_selection(start, start + char_len(text));
        }
        self.history.push_with(
            UndoState::replaced(start, old_text, text, !keep_selection),
            false,
        );
        self.mark_modified();
        true
    }

    /// Replaces the selection with `text` and selects the result.
    pub fn set_selected_text(&mut self, events: &mut EventRegistry, text: &str) -> bool {
        let (start, end) = self.storage.selection();
        self.replace_range(events, start, end, text, false)
    }

    /// Adds one indent unit to every line touched by the selection.
    pub fn indent_selection(&mut self, events: &mut EventRegistry) -> bool {
        let style = self.indent_style();
        self.rewrite_selected_lines(events, |block| indent_block(block, style))
    }

    /// Removes one indent unit from every line touched by the selection.
    pub fn unindent_selection(&mut self, events: &mut EventRegistry) -> bool {
        let style = self.indent_style();
        self.rewrite_selected_lines(events, |block| unindent_block(block, style))
    }

    fn rewrite_selected_lines(
        &mut self,
        events: &mut EventRegistry,
        rewrite: impl FnOnce(&str) -> String,
    ) -> bool {
        let (start, end) = self.storage.selection();
        let first = self.storage.line_of_offset(start);
        let last = self.storage.line_of_offset(end);
        let from = self.storage.line_start(first);
        let to = self.storage.line_end(last);
        let old = self.storage.substring(from, to);
        let new = rewrite(&old);
        if new == old {
            return false;
        }
        self.replace_range(events, from, to, &new, false)
    }

    /// Re-indents the whole document from `old_mode` to `new_mode` and
    /// switches the indentation mode. Returns `false` for invalid modes.
    pub fn replace_indentation(
        &mut self,
        events: &mut EventRegistry,
        old_mode: usize,
        new_mode: usize,
    ) -> bool {
        let (Some(old), Some(new)) = (
            IndentStyle::from_mode(old_mode),
            IndentStyle::from_mode(new_mode),
        ) else {
            return false;
        };
        if self.refuse_if_read_only(events) {
            return false;
        }
        let text = self.storage.text();
        let rewritten = reindent(&text, old, new);
        if rewritten != text {
            let (caret, _) = self.storage.selection();
            self.storage.replace_range(0, self.storage.len_chars(), &rewritten);
            self.storage.set_selection(caret, caret);
            self.history
                .push_with(UndoState::replaced(0, text, rewritten, false), false);
            self.mark_modified();
        }
        self.set_indentation_mode(events, new_mode)
    }

    /// Reverts the last edit. Raises [`Alert::NothingToUndo`] when there is none.
    pub fn undo(&mut self, events: &mut EventRegistry) -> bool {
        if !self.history.undo(self.storage.as_mut()) {
            events.alert(Alert::NothingToUndo);
            return false;
        }
        self.mark_modified();
        true
    }

    /// Re-applies the last undone edit. Raises [`Alert::NothingToRedo`] when there is none.
    pub fn redo(&mut self, events: &mut EventRegistry) -> bool {
        if !self.history.redo(self.storage.as_mut()) {
            events.alert(Alert::NothingToRedo);
            return false;
        }
        self.mark_modified();
        true
    }
}
