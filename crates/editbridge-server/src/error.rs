//! Dispatcher, registry and editor error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by an [`Editor`](crate::Editor) implementation.
#[derive(Error, Debug)]
pub enum EditorError {
    /// The operation needs an active document and there is none
    #[error("No active editor")]
    NoActiveEditor,

    /// The document is not open in any tab
    #[error("File is not open: {}", .0.display())]
    NotOpen(PathBuf),

    /// A named task, terminal or similar item does not exist
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up, e.g. `Task`
        kind: &'static str,
        /// The name that was not found
        name: String,
    },

    /// Reading or writing a file failed
    #[error("{}: {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An editor command failed
    #[error("Command '{command}' failed: {reason}")]
    Command {
        /// Command identifier
        command: String,
        /// Failure description
        reason: String,
    },

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl EditorError {
    /// Creates a new not found error.
    #[inline]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a new I/O error for `path`.
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new command error.
    #[inline]
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

/// Failure of a single method handler.
///
/// Always converted into a failure response; never closes the connection.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// `params` did not match what the method expects
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The editor operation failed
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// The handler was abandoned before it finished
    #[error("Operation cancelled")]
    Cancelled,

    /// Result could not be encoded
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl HandlerError {
    #[inline]
    pub fn invalid_params(details: impl ToString) -> Self {
        Self::InvalidParams(details.to_string())
    }
}

/// Result type alias for method handlers
pub type HandlerResult = Result<serde_json::Value, HandlerError>;

/// Method registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler with this name already exists
    #[error("Method already registered: {0}")]
    Duplicate(String),
}

/// Listener errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen address could not be bound
    #[error("Failed to bind editor bridge to {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Other socket failure
    #[error("Listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}
