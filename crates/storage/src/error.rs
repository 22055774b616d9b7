//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// File or repository does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (missing or insufficient credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// The remote store answered with a non-success status.
    #[display("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// Network-related error (connection refused, timeout, TLS, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Path contains invalid characters or escapes the repository root
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// Repository identifier could not be parsed
    #[display("invalid repository: {_0}")]
    InvalidRepository(#[error(not(source))] String),
    /// Response body could not be decoded
    #[display("decode error: {_0}")]
    Decode(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::BackendError(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Map a non-success HTTP status onto the closest actionable category.
    ///
    /// `subject` names the thing being requested (a path, URL or repository),
    /// and `message` is whatever the remote store said about it.
    pub fn from_status(status: u16, subject: impl Into<String>, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::PermissionDenied(subject.into()),
            404 => Self::NotFound(subject.into()),
            _ => Self::Http { status, message: message.into() },
        }
    }

    /// The HTTP status this error corresponds to, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::PermissionDenied(_) => Some(403),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
