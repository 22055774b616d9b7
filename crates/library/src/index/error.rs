//! Error types for the [`index`](super) module.

use derive_more::{Display, Error};

/// An indexing error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an indexing failure.
///
/// Only the listing can fail a pass. Metadata problems degrade a single
/// book and are reported through
/// [`MetadataOutcome`](crate::metadata::MetadataOutcome) instead.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The repository listing could not be fetched or was cut short.
    #[display("failed to list repository contents")]
    Listing,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// The underlying storage error in the tree decides; the kind alone
    /// can't tell.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::Listing => false,
        }
    }
}
