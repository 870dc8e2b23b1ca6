//! State shared by every document of one editing session.

use std::fmt;

use textpad_config::AppConfig;

use crate::document::{DiskIo, Document, FileIo};
use crate::events::EventRegistry;
use crate::history::history_for;
use crate::search::{FindHistory, PatternMatcher, RegexMatcher};
use crate::storage::RopeStorage;

/// Configuration, hooks, find history and the I/O seams documents use.
pub struct Session {
    pub config: AppConfig,
    pub events: EventRegistry,
    pub finds: FindHistory,
    pub matcher: Box<dyn PatternMatcher>,
    pub io: Box<dyn FileIo>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("events", &self.events)
            .field("finds", &self.finds)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self {
            finds: FindHistory::new(config.find_history_limit),
            config,
            events: EventRegistry::new(),
            matcher: Box::new(RegexMatcher::new()),
            io: Box::new(DiskIo),
        }
    }

    /// Replaces the pattern matcher used by find and replace.
    pub fn with_matcher(mut self, matcher: impl PatternMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Replaces the file system seam used by load, save and close.
    pub fn with_io(mut self, io: impl FileIo + 'static) -> Self {
        self.io = Box::new(io);
        self
    }

    /// An empty, untitled document with an undo history sized from the config.
    pub fn new_document(&self) -> Document {
        Document::with_storage(Box::new(RopeStorage::new()), history_for(&self.config))
    }
}
