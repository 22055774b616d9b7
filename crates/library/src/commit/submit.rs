use crate::commit::book::{NewBook, build_commit};
use crate::commit::error::{ErrorKind, Result};
use bookshelf_storage::error::ErrorKind as StorageErrorKind;
use bookshelf_storage::{BackendHandle, Commit, CommitInfo};
use exn::ResultExt;
use tracing::instrument;

/// Send an assembled commit to the backend's repository.
///
/// A refusal from the store becomes [`ErrorKind::Rejected`] with its status
/// and message; anything that never got an answer is [`ErrorKind::Storage`].
/// The storage error is kept underneath either way.
#[instrument(
    skip(backend, commit),
    fields(backend = backend.name(), repository = %backend.repository(), summary = %commit.summary),
)]
pub async fn submit(backend: &BackendHandle, commit: Commit) -> Result<CommitInfo> {
    let operations = commit.operations.len();
    let bytes = commit.payload_size();
    match backend.commit(commit).await {
        Ok(info) => {
            tracing::info!(operations, bytes, commit = ?info.commit_oid, "Commit accepted");
            Ok(info)
        },
        Err(err) => {
            let kind = rejection(&err);
            tracing::warn!(error = %kind, "Commit failed");
            Err(err).or_raise(|| kind.clone())
        },
    }
}

fn rejection(kind: &StorageErrorKind) -> ErrorKind {
    match kind {
        StorageErrorKind::Http { status, message } => ErrorKind::Rejected { status: *status, message: message.clone() },
        other => match other.status() {
            Some(status) => ErrorKind::Rejected { status, message: other.to_string() },
            None => ErrorKind::Storage,
        },
    }
}

/// Validate, build and submit a new book as one commit.
///
/// Every validation failure, including a backend without write
/// credentials, happens before anything is read or sent.
#[instrument(skip(backend, book), fields(backend = backend.name(), title = %book.title))]
pub async fn add_book(backend: &BackendHandle, book: NewBook) -> Result<CommitInfo> {
    let folder = book.validate()?;
    if !backend.can_commit() {
        exn::bail!(ErrorKind::MissingCredentials);
    }
    let commit = build_commit(book).await?;
    tracing::info!(%folder, operations = commit.operations.len(), "Uploading book");
    submit(backend, commit).await
}
