//! Dry-run remote store.
//!
//! This module provides a backend that wraps another implementation and
//! prevents commits from reaching the remote store, while still reporting
//! success.

use async_trait::async_trait;

use crate::{
    BackendHandle, RemoteStore,
    backend::ListEntryStream,
    error::Result,
    models::{Commit, CommitInfo, RepoId},
};

/// Read-only remote store.
///
/// Wraps another backend and silently drops every commit, logging an
/// [`info event`](tracing::Event) per operation that would have been
/// written. Reads pass straight through.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RemoteStore for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn repository(&self) -> &RepoId {
        self.inner.repository()
    }

    fn list_stream(&self) -> ListEntryStream<'_> {
        self.inner.list_stream()
    }

    fn resolve_url(&self, path: &str) -> Result<String> {
        self.inner.resolve_url(path)
    }

    fn raw_url(&self, path: &str) -> Result<String> {
        self.inner.raw_url(path)
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>> {
        self.inner.fetch_raw(url).await
    }

    fn can_commit(&self) -> bool {
        // Nothing is sent, so no credentials are needed.
        true
    }

    async fn commit(&self, commit: Commit) -> Result<CommitInfo> {
        for op in &commit.operations {
            tracing::info!(
                path = %op.path,
                bytes = op.len(),
                encoding = ?op.encoding(),
                "Skipping write during read-only mode"
            );
        }
        tracing::info!(summary = %commit.summary, "Skipping commit during read-only mode");
        Ok(CommitInfo::default())
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::CommitOperation;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_commit_is_dropped() {
        let mock = Arc::new(MockBackend::default().without_credentials());
        let backend = ReadOnlyBackend::new(mock.clone());
        assert!(backend.can_commit());
        let mut commit = Commit::new("dry run");
        commit.push(CommitOperation::text("Alpha/metadata.json", "{}").unwrap());
        let info = backend.commit(commit).await.unwrap();
        assert_eq!(info, CommitInfo::default());
        assert!(mock.commits().await.is_empty());
        assert!(mock.file("Alpha/metadata.json").await.is_none());
    }

    #[tokio::test]
    async fn test_reads_pass_through() {
        let mock = Arc::new(MockBackend::with_files([("Alpha/01.png", "x")]));
        let backend = ReadOnlyBackend::new(mock);
        assert_eq!(backend.list().await.unwrap().len(), 2);
        let url = backend.raw_url("Alpha/01.png").unwrap();
        assert_eq!(backend.fetch_raw(&url).await.unwrap(), b"x");
    }
}
