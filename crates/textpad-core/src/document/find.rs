//! Find and replace over a document, driven by the session's find history.

use textpad_mod_history::UndoState;

use crate::error::DocumentError;
use crate::events::Alert;
use crate::search::{Direction, FindFlags, FindSpec};
use crate::session::Session;

use super::Document;

/// Length in chars of the common prefix and common suffix of `a` and `b`.
/// The two never overlap in either string.
fn common_affixes(a: &str, b: &str) -> (usize, usize) {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let max_suffix = a.len().min(b.len()) - prefix;
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();
    (prefix, suffix)
}

impl Document {
    /// Searches down from the end of the selection with the most recent
    /// find spec and selects the match.
    ///
    /// Without any spec an [`Alert::NeedFindSpec`] is raised; without a
    /// match an [`Alert::NotFound`]. Neither changes the selection.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidPattern`] for a malformed regex.
    pub fn find_next(&mut self, session: &mut Session) -> Result<bool, DocumentError> {
        self.find_from_front(session, Direction::Forward)
    }

    /// Like [`Document::find_next`], searching up from the selection start.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidPattern`] for a malformed regex.
    pub fn find_previous(&mut self, session: &mut Session) -> Result<bool, DocumentError> {
        self.find_from_front(session, Direction::Backward)
    }

    fn find_from_front(
        &mut self,
        session: &mut Session,
        direction: Direction,
    ) -> Result<bool, DocumentError> {
        let Some(spec) = session.finds.front().cloned() else {
            session.events.alert(Alert::NeedFindSpec);
            return Ok(false);
        };
        self.search_with(session, spec, direction)
    }

    fn search_with(
        &mut self,
        session: &mut Session,
        spec: FindSpec,
        direction: Direction,
    ) -> Result<bool, DocumentError> {
        let (start, end) = self.storage.selection();
        let from = match direction {
            Direction::Forward => end,
            Direction::Backward => start,
        };
        let haystack = self.storage.text();
        let found = session.matcher.search(
            &haystack,
            &spec.search_text,
            from,
            spec.flags,
            direction,
        )?;
        match found {
            Some((s, e)) => {
                self.storage.set_selection(s, e);
                Ok(true)
            }
            None => {
                session.events.alert(Alert::NotFound {
                    search_text: spec.search_text,
                });
                Ok(false)
            }
        }
    }

    /// Records a find spec and searches with it in the direction its flags
    /// name.
    ///
    /// A `stealth` search leaves the find history as it was, unless an
    /// equal spec was already there (it still moves to the front).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidPattern`] for a malformed regex.
    pub fn find(
        &mut self,
        session: &mut Session,
        search_text: &str,
        flags: FindFlags,
        stealth: bool,
    ) -> Result<bool, DocumentError> {
        let spec = FindSpec::new(search_text, flags);
        if !stealth || session.finds.iter().any(|s| *s == spec) {
            session.finds.push(spec.clone());
        }
        self.search_with(session, spec, Direction::from_flags(flags))
    }

    /// Replaces every match within the selection, or across the whole
    /// document when nothing is selected, as a single undo step.
    ///
    /// The pattern is validated before anything changes. With a selection
    /// the replaced span is selected afterwards; otherwise the caret stays
    /// where it was. The document is marked modified in every case. Returns
    /// the number of replacements.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidPattern`] for a malformed regex.
    pub fn replace(
        &mut self,
        session: &mut Session,
        search_text: &str,
        replace_text: &str,
        flags: FindFlags,
        stealth: bool,
    ) -> Result<usize, DocumentError> {
        let flags = flags - FindFlags::SEARCH_UP;
        session.matcher.validate(search_text, flags)?;
        if self.is_read_only() {
            session.events.alert(Alert::ReadOnly);
            return Ok(0);
        }
        if !stealth {
            session
                .finds
                .push(FindSpec::new(search_text, flags).with_replacement(replace_text));
        }

        let (start, end) = self.storage.selection();
        let count = if start != end {
            let old = self.storage.substring(start, end);
            let (new, count) = session
                .matcher
                .replace_all(&old, search_text, replace_text, flags)?;
            if count > 0 {
                self.storage.replace_range(start, end, &new);
                self.storage
                    .set_selection(start, start + new.chars().count());
                self.history
                    .push_with(UndoState::replaced(start, old, new, true), false);
            }
            count
        } else {
            let old = self.storage.text();
            let (new, count) = session
                .matcher
                .replace_all(&old, search_text, replace_text, flags)?;
            if count > 0 {
                let (prefix, suffix) = common_affixes(&old, &new);
                let old_len = old.chars().count();
                let new_len = new.chars().count();
                let old_mid = self.storage.substring(prefix, old_len - suffix);
                let new_mid: String = new
                    .chars()
                    .skip(prefix)
                    .take(new_len - suffix - prefix)
                    .collect();
                self.storage
                    .replace_range(prefix, old_len - suffix, &new_mid);
                self.storage.set_selection(start, start);
                self.history
                    .push_with(UndoState::replaced(prefix, old_mid, new_mid, false), false);
            }
            count
        };

        if count == 0 {
            session.events.alert(Alert::NotFound {
                search_text: search_text.to_string(),
            });
        }
        tracing::debug!(count, "replaced matches of {search_text:?}");
        self.mark_modified();
        Ok(count)
    }
}
