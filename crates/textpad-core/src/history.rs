//! Undo history used by documents, sized from the application config.

pub use textpad_mod_history::{DeleteSelect, HistoryConfig, UndoHistory, UndoState, UndoTarget};

use textpad_config::AppConfig;

/// A fresh history capped at the configured undo limit.
pub fn history_for(config: &AppConfig) -> UndoHistory {
    UndoHistory::new(HistoryConfig::with_max_entries(config.undo_limit))
}
