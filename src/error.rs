//! Error types for files-sync

use std::path::PathBuf;
use thiserror::Error;

/// Error type for files-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration: bad repository identifier, invalid pattern,
    /// unparsable config file
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem failure while resolving the files of a pattern
    #[error("failed to resolve {}: {message}", path.display())]
    Resolution {
        /// Source path that could not be read
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Template rendering failed
    #[error("template error: {0}")]
    Template(String),

    /// Repository host rejected or failed an operation
    #[error("{operation} failed: {message}")]
    Remote {
        /// Host operation name (e.g. `create_tree`)
        operation: String,
        /// Failure details
        message: String,
    },

    /// GitHub API error surfaced by octocrab
    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mergeability signals were malformed or unexpected
    #[error("unexpected merge state: {0}")]
    MergeState(String),

    /// No usable credentials
    #[error("authentication error: {0}")]
    Auth(String),

    /// I/O error outside source resolution
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error annotated with where it happened
    #[error("{context}: {source}")]
    Context {
        /// Location of the failure (pattern, destination, step)
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a [`Error::Remote`] for a named host operation.
    pub fn remote(operation: &str, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Resolution`] for a source path.
    pub fn resolution(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Resolution {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with a location description.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure came from the repository host.
    pub fn is_remote(&self) -> bool {
        matches!(
            self.root(),
            Self::Remote { .. } | Self::GitHub(_) | Self::Http(_)
        )
    }
}

/// Attach location context to fallible results.
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a lazily built context string.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Result type alias for files-sync operations
pub type Result<T> = std::result::Result<T, Error>;
