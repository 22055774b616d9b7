//! Error types for the [`commit`](super) module.

use derive_more::{Display, Error};

/// A commit error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for commit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a commit failure.
///
/// ### Validation Errors
/// Raised before anything is read or sent.
/// - [`ErrorKind::MissingTitle`]
/// - [`ErrorKind::NoFiles`]
/// - [`ErrorKind::MissingCredentials`]
/// - [`ErrorKind::InvalidFolderName`]
/// - [`ErrorKind::InvalidFileName`]
///
/// ### Build Errors
/// Raised while assembling the payload; nothing has been sent.
/// - [`ErrorKind::UnreadableFile`]
/// - [`ErrorKind::Serialize`]
///
/// ### Submission Errors
/// - [`ErrorKind::Rejected`] - the store answered and said no.
/// - [`ErrorKind::Storage`] - the store could not be reached.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("book title is empty")]
    MissingTitle,
    #[display("no page files were selected")]
    NoFiles,
    #[display("no write credentials configured for the repository")]
    MissingCredentials,
    /// The folder name is not a single repository path segment.
    #[display("invalid folder name: {_0:?}")]
    InvalidFolderName(#[error(not(source))] String),
    /// A page's file name cannot be used inside the book folder.
    #[display("invalid page file name: {_0:?}")]
    InvalidFileName(#[error(not(source))] String),
    /// A page backed by a local file could not be read.
    #[display("cannot read page file {_0}")]
    UnreadableFile(#[error(not(source))] String),
    #[display("cannot serialize book metadata")]
    Serialize,
    /// The remote store refused the commit.
    #[display("commit rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The commit could not be delivered.
    #[display("failed to submit commit")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this failure happened before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingTitle
                | Self::NoFiles
                | Self::MissingCredentials
                | Self::InvalidFolderName(_)
                | Self::InvalidFileName(_)
        )
    }
}
