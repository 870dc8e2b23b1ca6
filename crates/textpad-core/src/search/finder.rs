/// Find specifications and the session's most-recently-used list of them.
use std::collections::VecDeque;

use bitflags::bitflags;

/// Default number of find specs remembered.
pub const DEFAULT_FIND_HISTORY: usize = 32;

bitflags! {
    /// Options of a find or replace request. The empty set means a
    /// case-insensitive literal search downwards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FindFlags: u8 {
        const CASE_SENSITIVE = 1;
        const REGEX = 1 << 1;
        const SEARCH_UP = 1 << 2;
    }
}

/// One find/replace request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FindSpec {
    pub search_text: String,
    pub replace_text: String,
    pub flags: FindFlags,
}

impl FindSpec {
    pub fn new(search_text: impl Into<String>, flags: FindFlags) -> Self {
        Self {
            search_text: search_text.into(),
            replace_text: String::new(),
            flags,
        }
    }

    pub fn with_replacement(mut self, replace_text: impl Into<String>) -> Self {
        self.replace_text = replace_text.into();
        self
    }
}

/// Bounded MRU list of find specs, newest first, without duplicates.
#[derive(Debug, Clone)]
pub struct FindHistory {
    entries: VecDeque<FindSpec>,
    limit: usize,
}

impl Default for FindHistory {
    fn default() -> Self {
        Self::new(DEFAULT_FIND_HISTORY)
    }
}

impl FindHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Moves `spec` to the front, inserting it if absent and dropping the
    /// oldest entry past the limit.
    ///
    /// Returns `true` when the spec was not in the list before.
    pub fn push(&mut self, spec: FindSpec) -> bool {
        let existing = self.entries.iter().position(|s| *s == spec);
        if let Some(idx) = existing {
            self.entries.remove(idx);
        }
        self.entries.push_front(spec);
        self.entries.truncate(self.limit);
        existing.is_none()
    }

    /// Removes the most recent entry.
    pub fn retract_front(&mut self) -> Option<FindSpec> {
        self.entries.pop_front()
    }

    /// The most recent spec.
    pub fn front(&self) -> Option<&FindSpec> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FindSpec> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
