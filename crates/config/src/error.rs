//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source could not be read or a value has the wrong type.
    #[display("failed to load configuration")]
    Extract,
    #[display("invalid repository {_0:?}")]
    InvalidRepository(#[error(not(source))] String),
    #[display("endpoint must not be empty")]
    EmptyEndpoint,
    #[display("revision must not be empty")]
    EmptyRevision,
    #[display("timeout must be at least one second")]
    InvalidTimeout,
}
