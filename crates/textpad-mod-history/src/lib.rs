/// Undo/redo history for a single document.
///
/// Provides an `UndoHistory` that keeps a bounded, linear list of reversible
/// edit states. Keystroke-level edits that touch adjacent text are coalesced
/// into the previous state so one undo step covers a whole typed run.
pub mod config;
pub mod manager;
pub mod state;

pub use config::HistoryConfig;
pub use manager::UndoHistory;
pub use state::{DeleteSelect, UndoState, UndoTarget};
