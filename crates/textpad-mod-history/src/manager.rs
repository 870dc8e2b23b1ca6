/// Linear undo/redo history with adjacent-edit coalescing.
///
/// States before the cursor are undoable, states at or after it are
/// redoable. Recording a new state while redo states exist discards them.
use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::state::{UndoState, UndoTarget};

/// Manages undo/redo history for a single document.
#[derive(Debug, Clone, Default)]
pub struct UndoHistory {
    /// Recorded states, oldest first.
    entries: VecDeque<UndoState>,
    /// Redo index: number of states currently applied.
    current: usize,
    /// Configuration parameters.
    config: HistoryConfig,
}

impl UndoHistory {
    /// Creates an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            current: 0,
            config,
        }
    }

    /// Records a state, coalescing it with the previous one when possible.
    pub fn push(&mut self, state: UndoState) {
        self.push_with(state, true);
    }

    /// Records a state.
    ///
    /// With `try_join`, the state is merged into the previous entry when the
    /// cursor sits right after the last entry and the two are contiguous.
    pub fn push_with(&mut self, state: UndoState, try_join: bool) {
        let state = if try_join && self.current > 0 && self.current == self.entries.len() {
            match self.entries.back_mut() {
                Some(last) => match last.join(state) {
                    Ok(()) => {
                        tracing::trace!(kind = last.kind(), "coalesced undo state");
                        return;
                    }
                    Err(state) => state,
                },
                None => state,
            }
        } else {
            state
        };

        self.entries.truncate(self.current);
        self.entries.push_back(state);
        let capacity = self.config.capacity();
        while self.entries.len() > capacity {
            self.entries.pop_front();
            tracing::debug!(capacity, "evicted oldest undo state");
        }
        self.current = self.entries.len();
    }

    /// Reverts the most recent applied state.
    ///
    /// Returns `false` without touching `target` when there is nothing to undo.
    pub fn undo<T: UndoTarget + ?Sized>(&mut self, target: &mut T) -> bool {
        if self.current == 0 || self.current > self.entries.len() {
            return false;
        }
        self.current -= 1;
        self.entries[self.current].undo(target);
        true
    }

    /// Re-applies the most recently undone state.
    ///
    /// Returns `false` without touching `target` when there is nothing to redo.
    pub fn redo<T: UndoTarget + ?Sized>(&mut self, target: &mut T) -> bool {
        if self.current >= self.entries.len() {
            return false;
        }
        self.entries[self.current].redo(target);
        self.current += 1;
        true
    }

    /// Whether undo is available.
    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    /// Whether redo is available.
    pub fn can_redo(&self) -> bool {
        self.current < self.entries.len()
    }

    /// Number of states that can be undone.
    pub fn undo_count(&self) -> usize {
        self.current
    }

    /// Number of states that can be redone.
    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.current
    }

    /// Total number of recorded states.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded states, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &UndoState> {
        self.entries.iter()
    }

    /// The most recent undoable state, if any.
    pub fn last_applied(&self) -> Option<&UndoState> {
        self.current
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
    }

    /// Drops all states.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = 0;
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }
}
