//! Error taxonomy for a reconciliation run

use std::path::PathBuf;
use thiserror::Error;

/// Result type for mirroring operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that abort a run
///
/// An entry the configured user cannot read is not an error: the access
/// filter drops it from the source inventory instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A relative name escaped the safe form before a mutation
    #[error("unsafe relative path {0:?}")]
    UnsafePath(String),

    /// Two physical source files map to the same destination name
    #[error("name collision: {first:?} and {second:?} both map to {logical:?}")]
    NameCollision {
        logical: String,
        first: String,
        second: String,
    },

    /// Normalization reduced a path segment to nothing
    #[error("normalizing {0:?} produced an empty path segment")]
    EmptySegment(String),

    /// A tag required for naming is missing
    #[error("{path}: missing {tag} tag")]
    MissingTag { path: PathBuf, tag: &'static str },

    /// Tags could not be read or written
    #[error("{path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// The external encoder failed
    #[error("encoding {path} failed: {message}")]
    Encoder { path: PathBuf, message: String },

    /// The configured user does not exist
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem operation failed
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// System user/group lookup failed
    #[error("user lookup failed: {0}")]
    Lookup(#[from] nix::Error),
}

impl SyncError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Attach a path to `std::io::Result` values
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| SyncError::io(path, e))
    }
}
