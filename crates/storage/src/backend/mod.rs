//! Remote store trait and implementations.
//!
//! This module defines the `RemoteStore` trait, which provides the small
//! surface the bookshelf core needs from a content repository: list what is
//! there, fetch a raw file, and apply a multi-file commit.
//!

#[cfg(feature = "hub")]
mod hub;
#[cfg(feature = "mock")]
mod mock;
mod ro;

#[cfg(feature = "hub")]
pub use self::hub::{DEFAULT_ENDPOINT, DEFAULT_REVISION, HubBackend};
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::models::{Commit, CommitInfo, ListEntry, RepoId};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub(crate) type ListEntryStream<'a> = Pin<Box<dyn Stream<Item = Result<ListEntry>> + Send + 'a>>;

/// Unified interface for remote content stores.
///
/// Every backend is bound to exactly one repository (and, where writes are
/// possible, one set of credentials) at construction time, so none of the
/// operations take a repository argument.
///
/// # Path Handling
/// All paths are relative to the repository root and are validated using
/// [`validate_path`](crate::validate_path) before use.
///
/// # Examples
///
/// ```
/// use bookshelf_storage::{backend::RemoteStore, error::Result};
///
/// async fn first_bytes(store: &dyn RemoteStore, path: &str) -> Result<Vec<u8>> {
///     let url = store.raw_url(path)?;
///     let mut data = store.fetch_raw(&url).await?;
///     data.truncate(16);
///     Ok(data)
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Repository this backend reads from and commits to.
    fn repository(&self) -> &RepoId;

    /// List every entry in the repository.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning. Any error aborts the whole listing.
    async fn list(&self) -> Result<Vec<ListEntry>> {
        self.list_stream().try_collect().await
    }

    /// Stream the repository listing, recursively.
    ///
    /// The stream is finite and cannot be restarted; each call reflects the
    /// remote state at call time. Both files and directories are yielded.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use bookshelf_storage::{backend::RemoteStore, error::Result};
    /// # async fn example(store: &dyn RemoteStore) -> Result<()> {
    /// let mut stream = store.list_stream();
    /// while let Some(entry) = stream.try_next().await? {
    ///     if entry.is_file() {
    ///         println!("{}", entry.path);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream(&self) -> ListEntryStream<'_>;

    /// Address a listed file should be displayed/downloaded from. May
    /// redirect (e.g. to a large-file CDN).
    fn resolve_url(&self, path: &str) -> Result<String>;

    /// Direct, non-redirecting address of a file's raw content. Used for
    /// small text documents where following a cross-origin redirect is
    /// undesirable.
    fn raw_url(&self, path: &str) -> Result<String>;

    /// Fetch the full body behind `url`.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) for a 404 and
    /// [`Http`](crate::error::ErrorKind::Http) for any other non-success
    /// status.
    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>>;

    /// Whether this backend holds credentials that allow committing.
    fn can_commit(&self) -> bool;

    /// Apply all operations of `commit` atomically.
    ///
    /// A refused commit surfaces as a single error carrying the remote
    /// status and message. Once submitted there is no cancellation: a caller
    /// that stops waiting must not assume the commit was rolled back.
    async fn commit(&self, commit: Commit) -> Result<CommitInfo>;
}
