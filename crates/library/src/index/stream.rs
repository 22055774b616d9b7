use crate::BookEntry;
use crate::index::error::{ErrorKind, Result};
use crate::index::group::group_files;
use crate::metadata;
use async_stream::stream;
use bookshelf_storage::{BackendHandle, ListEntry, RemoteFile};
use exn::ResultExt;
use futures::{Stream, TryStreamExt};
use std::pin::pin;
use tracing::instrument;

/// Progress events emitted by [`index_stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of books found in the listing.
/// 3. [`Indexed`](Self::Indexed), once per book, in grouping order.
/// 4. [`Complete`](Self::Complete), exactly once.
///
/// A listing failure ends the stream with a single `Err` right after
/// [`Started`](Self::Started); no book is ever emitted in that case.
#[derive(Debug)]
pub enum IndexEvent {
    Started,
    DiscoveryComplete(u64),
    Indexed(Box<BookEntry>),
    Complete,
}

/// Streams [`IndexEvent`]s for one indexing pass over `backend`.
///
/// The listing is drained into a snapshot first, then each group's metadata
/// is resolved strictly one after another so books come out in a stable
/// order. A missing or broken metadata document only degrades its own book.
pub fn index_stream(backend: &BackendHandle) -> impl Stream<Item = Result<IndexEvent>> + '_ {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(IndexEvent::Started);

        let entries = match backend.list().await.or_raise(|| ErrorKind::Listing) {
            Ok(entries) => entries,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        let files = entries.into_iter().filter(ListEntry::is_file).filter_map(|entry| {
            match backend.resolve_url(&entry.path) {
                Ok(url) => Some(RemoteFile::new(entry.path, url)),
                Err(err) => {
                    let kind: &bookshelf_storage::error::ErrorKind = &err;
                    tracing::warn!(path = %entry.path, error = %kind, "Skipping unaddressable file");
                    None
                },
            }
        });
        let groups = group_files(files);
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(IndexEvent::DiscoveryComplete(u64::try_from(groups.len()).unwrap_or(u64::MAX)));

        for group in groups {
            let metadata = match &group.metadata {
                Some(document) => metadata::resolve(backend, &document.path).await.into_metadata(),
                None => None,
            };
            if let Some(book) = BookEntry::assemble(group.folder_name, group.pages, metadata) {
                yield Ok(IndexEvent::Indexed(Box::new(book)));
            }
        }

        yield Ok(IndexEvent::Complete);
    })
}

/// Run a full indexing pass and collect the books in order.
#[instrument(skip(backend), fields(backend = backend.name(), repository = %backend.repository()))]
pub async fn index(backend: &BackendHandle) -> Result<Vec<BookEntry>> {
    let mut events = pin!(index_stream(backend));
    let mut books = Vec::new();
    while let Some(event) = events.try_next().await? {
        match event {
            IndexEvent::DiscoveryComplete(groups) => tracing::debug!(groups, "Listing grouped into books"),
            IndexEvent::Indexed(book) => books.push(*book),
            IndexEvent::Started | IndexEvent::Complete => {},
        }
    }
    tracing::info!(books = books.len(), "Indexed bookshelf");
    Ok(books)
}
