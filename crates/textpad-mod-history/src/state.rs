/// Reversible edit states and their coalescing rules.
use serde::{Deserialize, Serialize};

/// The text surface an undo state is replayed against.
///
/// Offsets are char offsets. Implemented by the document's text storage.
pub trait UndoTarget {
    /// Replaces the char range `[start, end)` with `text`.
    fn replace_range(&mut self, start: usize, end: usize, text: &str);
    /// Sets the selection to `[start, end)`. An empty range places the caret.
    fn set_selection(&mut self, start: usize, end: usize);
}

/// Where the caret goes when a deletion is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeleteSelect {
    /// Caret after the restored text (backspace).
    #[default]
    CaretAfter,
    /// The restored text is selected (a deleted selection).
    Restored,
    /// Caret stays before the restored text (forward delete).
    CaretAtStart,
}

/// A single reversible edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoState {
    /// `text` was inserted at `position`.
    Inserted {
        position: usize,
        text: String,
        select_after: bool,
    },
    /// `text` was removed from `[start, end)`.
    Deleted {
        start: usize,
        end: usize,
        text: String,
        select: DeleteSelect,
    },
    /// `old_text` at `position` was replaced by `new_text`.
    Replaced {
        position: usize,
        old_text: String,
        new_text: String,
        select_after: bool,
    },
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl UndoState {
    /// Convenience constructor for an insertion.
    pub fn inserted(position: usize, text: impl Into<String>) -> Self {
        Self::Inserted {
            position,
            text: text.into(),
            select_after: false,
        }
    }

    /// Convenience constructor for a deletion of `text` starting at `start`.
    pub fn deleted(start: usize, text: impl Into<String>, select: DeleteSelect) -> Self {
        let text = text.into();
        Self::Deleted {
            start,
            end: start + char_len(&text),
            text,
            select,
        }
    }

    /// Convenience constructor for a replacement.
    pub fn replaced(
        position: usize,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
        select_after: bool,
    ) -> Self {
        Self::Replaced {
            position,
            old_text: old_text.into(),
            new_text: new_text.into(),
            select_after,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "inserted",
            Self::Deleted { .. } => "deleted",
            Self::Replaced { .. } => "replaced",
        }
    }

    /// Reverts the effect of this state.
    pub fn undo<T: UndoTarget + ?Sized>(&self, target: &mut T) {
        match self {
            Self::Inserted { position, text, .. } => {
                target.replace_range(*position, position + char_len(text), "");
                target.set_selection(*position, *position);
            }
            Self::Deleted {
                start,
                end,
                text,
                select,
            } => {
                target.replace_range(*start, *start, text);
                match select {
                    DeleteSelect::CaretAtStart => target.set_selection(*start, *start),
                    DeleteSelect::Restored => target.set_selection(*start, *end),
                    DeleteSelect::CaretAfter => {
                        let caret = start + char_len(text);
                        target.set_selection(caret, caret);
                    }
                }
            }
            Self::Replaced {
                position,
                old_text,
                new_text,
                select_after,
            } => {
                target.replace_range(*position, position + char_len(new_text), old_text);
                let end = position + char_len(old_text);
                if *select_after {
                    target.set_selection(*position, end);
                } else {
                    target.set_selection(end, end);
                }
            }
        }
    }

    /// Re-applies the effect of this state.
    pub fn redo<T: UndoTarget + ?Sized>(&self, target: &mut T) {
        match self {
            Self::Inserted {
                position,
                text,
                select_after,
            } => {
                target.replace_range(*position, *position, text);
                let end = position + char_len(text);
                if *select_after {
                    target.set_selection(*position, end);
                } else {
                    target.set_selection(end, end);
                }
            }
            Self::Deleted { start, end, .. } => {
                target.replace_range(*start, *end, "");
                target.set_selection(*start, *start);
            }
            Self::Replaced {
                position,
                old_text,
                new_text,
                select_after,
            } => {
                target.replace_range(*position, position + char_len(old_text), new_text);
                let end = position + char_len(new_text);
                if *select_after {
                    target.set_selection(*position, end);
                } else {
                    target.set_selection(end, end);
                }
            }
        }
    }

    /// Tries to merge `next` into `self`.
    ///
    /// Returns `next` back unchanged when the two states are not contiguous
    /// edits of the same kind. Replacements never merge.
    pub fn join(&mut self, next: UndoState) -> Result<(), UndoState> {
        let joined = match (&mut *self, &next) {
            (
                Self::Inserted { position, text, .. },
                Self::Inserted {
                    position: next_pos,
                    text: next_text,
                    ..
                },
            ) if *next_pos == *position + char_len(text) => {
                text.push_str(next_text);
                true
            }
            (
                Self::Deleted { start, text, .. },
                Self::Deleted {
                    start: next_start,
                    end: next_end,
                    text: next_text,
                    ..
                },
            ) if *next_end == *start => {
                // Backspace run: the new deletion sits just before ours.
                text.insert_str(0, next_text);
                *start = *next_start;
                true
            }
            (
                Self::Deleted {
                    start, end, text, ..
                },
                Self::Deleted {
                    start: next_start,
                    end: next_end,
                    text: next_text,
                    ..
                },
            ) if *next_start == *start => {
                // Forward-delete run at a fixed caret.
                text.push_str(next_text);
                *end += next_end - next_start;
                true
            }
            _ => false,
        };
        if joined {
            Ok(())
        } else {
            Err(next)
        }
    }
}
