//! Per-book metadata resolution.
//!
//! One book's metadata must never stop the rest of the library from loading,
//! so [`resolve`] doesn't fail: every way of not getting a document is an
//! [`MetadataOutcome`] variant, and [`MetadataOutcome::into_metadata`]
//! collapses them all to "no metadata".

use crate::models::BookMetadata;
use bookshelf_storage::BackendHandle;
use bookshelf_storage::error::ErrorKind as StorageErrorKind;
use tracing::instrument;

/// Result of looking up one book's metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// The document was fetched and parsed.
    Found(BookMetadata),
    /// There is no document (not listed, or the store answered 404).
    Absent,
    /// The document could not be fetched.
    Unavailable(StorageErrorKind),
    /// The document was fetched but is not a JSON object.
    Invalid(String),
}
impl MetadataOutcome {
    /// The metadata, if it was found.
    pub fn into_metadata(self) -> Option<BookMetadata> {
        match self {
            Self::Found(metadata) => Some(metadata),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Whether a document was expected but could not be used.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Invalid(_))
    }
}

/// Fetch and parse the metadata document at `metadata_path` in the backend's
/// repository.
///
/// Uses the direct raw-content URL (never a redirecting one) and makes
/// exactly one attempt. Failures are logged and returned as outcomes rather
/// than errors.
#[instrument(skip(backend), fields(backend = backend.name()))]
pub async fn resolve(backend: &BackendHandle, metadata_path: &str) -> MetadataOutcome {
    let url = match backend.raw_url(metadata_path) {
        Ok(url) => url,
        Err(err) => {
            let kind: &StorageErrorKind = &err;
            tracing::warn!(error = %kind, "Cannot address metadata document");
            return MetadataOutcome::Unavailable(kind.clone());
        },
    };
    let bytes = match backend.fetch_raw(&url).await {
        Ok(bytes) => bytes,
        Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {
            tracing::debug!(%url, "Metadata document not found");
            return MetadataOutcome::Absent;
        },
        Err(err) => {
            let kind: &StorageErrorKind = &err;
            tracing::warn!(%url, error = %kind, "Failed to fetch metadata document; continuing without it");
            return MetadataOutcome::Unavailable(kind.clone());
        },
    };
    match BookMetadata::from_json(&bytes) {
        Ok(metadata) => MetadataOutcome::Found(metadata),
        Err(err) => {
            tracing::warn!(%url, error = %err, "Metadata document is not valid; continuing without it");
            MetadataOutcome::Invalid(err.to_string())
        },
    }
}
