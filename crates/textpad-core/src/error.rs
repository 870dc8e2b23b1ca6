//! Errors surfaced at the document boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by document operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The search pattern is not a valid regular expression.
    #[error("invalid search pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The document is flagged as never saveable.
    #[error("this document cannot be saved")]
    SaveRefused,

    /// Saving needs a file name and none was given.
    #[error("a file name is required to save this document")]
    PathRequired,

    /// Reload requested on a document without a file or flagged not to reload.
    #[error("this document cannot be reloaded")]
    ReloadRefused,

    /// Content could not be decoded or encoded.
    #[error(transparent)]
    Codec(#[from] anyhow::Error),
}

impl DocumentError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Signed error code for I/O failures: the negated OS error number, or
    /// `-1` when the OS did not report one. `None` for other errors.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => Some(source.raw_os_error().map_or(-1, |c| -c.abs())),
            _ => None,
        }
    }
}
