//! Document model of the textpad editor: encoded text files held as
//! CRLF-normalized text with undo history, format detection,
//! indentation-aware editing and find/replace.
pub mod document;
pub mod encoding;
pub mod error;
pub mod events;
pub mod format;
pub mod history;
pub mod host;
pub mod indent;
pub mod search;
pub mod session;
pub mod storage;

pub use document::{CloseDecision, DiskIo, DocState, Document, DocumentFlags, FileIo, UNTITLED};
pub use encoding::{LineEnding, TextEncoding};
pub use error::DocumentError;
pub use events::{Alert, AttrChange, EventRegistry, HookId, HookResult};
pub use format::{DetectedFormat, FormatDefaults, FormatDetector, FormatParams};
pub use host::{DocumentHost, HostError, HostHandle};
pub use indent::IndentStyle;
pub use search::{Direction, FindFlags, FindHistory, FindSpec, PatternMatcher, RegexMatcher};
pub use session::Session;
pub use storage::{RopeStorage, TextStorage};
