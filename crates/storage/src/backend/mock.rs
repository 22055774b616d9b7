//! In-memory remote store for testing.

use super::ListEntryStream;
use crate::error::{ErrorKind, Result};
use crate::models::{Commit, CommitInfo, ListEntry, RepoId};
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::RemoteStore;

const RESOLVE_PREFIX: &str = "mock://resolve/";
const RAW_PREFIX: &str = "mock://raw/";

/// In-memory remote store for testing.
///
/// Files are kept in insertion order behind a [`RwLock`], so listings are
/// deterministic and all trait methods can operate on `&self`. Failures of
/// the listing, of individual fetches and of commits can be injected, and
/// every fetch and commit is recorded for later assertions.
///
/// # Examples
///
/// ```
/// use bookshelf_storage::backend::{MockBackend, RemoteStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> bookshelf_storage::error::Result<()> {
/// let backend = MockBackend::with_files([
///     ("Alpha/01.png", b"png"),
/// ]);
/// let url = backend.raw_url("Alpha/01.png")?;
/// assert_eq!(backend.fetch_raw(&url).await?, b"png");
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    repository: RepoId,
    storage: RwLock<Vec<(String, Vec<u8>)>>,
    listing_failure: Option<ErrorKind>,
    fetch_statuses: HashMap<String, u16>,
    commit_rejection: Option<(u16, String)>,
    credentials: bool,
    fetched: RwLock<Vec<String>>,
    commits: RwLock<Vec<Commit>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files, listed in the given
    /// order.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut storage: Vec<(String, Vec<u8>)> = Vec::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {path}");
            };
            let data = data.into();
            match storage.iter_mut().find(|(existing, _)| *existing == validated) {
                Some((_, existing)) => *existing = data,
                None => storage.push((validated, data)),
            }
        }
        Self {
            name: "mock".to_string(),
            repository: RepoId::dataset("mock/bookshelf"),
            storage: RwLock::new(storage),
            listing_failure: None,
            fetch_statuses: HashMap::new(),
            commit_rejection: None,
            credentials: true,
            fetched: RwLock::new(Vec::new()),
            commits: RwLock::new(Vec::new()),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Change the repository the mock claims to be bound to.
    pub fn with_repository(mut self, repository: RepoId) -> Self {
        self.repository = repository;
        self
    }

    /// Make every listing fail with `kind`.
    pub fn with_listing_failure(mut self, kind: ErrorKind) -> Self {
        self.listing_failure = Some(kind);
        self
    }

    /// Make fetches of `path` (raw or resolved) answer with `status`.
    pub fn with_fetch_status(mut self, path: impl Into<String>, status: u16) -> Self {
        self.fetch_statuses.insert(path.into(), status);
        self
    }

    /// Make every commit fail with the given remote status and message.
    pub fn with_commit_rejection(mut self, status: u16, message: impl Into<String>) -> Self {
        self.commit_rejection = Some((status, message.into()));
        self
    }

    /// Behave like a store configured without a write token.
    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    /// URLs passed to [`fetch_raw()`](RemoteStore::fetch_raw), in call order.
    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    /// Commits that were successfully applied, in order.
    pub async fn commits(&self) -> Vec<Commit> {
        self.commits.read().await.clone()
    }

    /// Current contents of `path`, if any.
    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        let guard = self.storage.read().await;
        guard.iter().find(|(existing, _)| existing == path).map(|(_, data)| data.clone())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl RemoteStore for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository(&self) -> &RepoId {
        &self.repository
    }

    fn list_stream(&self) -> ListEntryStream<'_> {
        if let Some(kind) = &self.listing_failure {
            let err = exn::Exn::from(kind.clone());
            return Box::pin(futures::stream::once(async { Err(err) }));
        }
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let paths: Vec<String> = {
                let guard = self.storage.read().await;
                guard.iter().map(|(path, _)| path.clone()).collect()
            };
            // Mirror the Hub's tree listing: parent directories show up as
            // their own entries ahead of the files inside them.
            let mut directories = HashSet::new();
            for path in paths {
                let segments: Vec<&str> = path.split('/').collect();
                let mut parent = String::new();
                for segment in &segments[..segments.len() - 1] {
                    if !parent.is_empty() {
                        parent.push('/');
                    }
                    parent.push_str(segment);
                    if directories.insert(parent.clone()) {
                        yield Ok(ListEntry::directory(parent.clone()));
                    }
                }
                yield Ok(ListEntry::file(path));
            }
        })
    }

    fn resolve_url(&self, path: &str) -> Result<String> {
        Ok(format!("{RESOLVE_PREFIX}{}", validate_path(path)?))
    }

    fn raw_url(&self, path: &str) -> Result<String> {
        Ok(format!("{RAW_PREFIX}{}", validate_path(path)?))
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>> {
        self.fetched.write().await.push(url.to_string());
        let Some(path) = url.strip_prefix(RAW_PREFIX).or_else(|| url.strip_prefix(RESOLVE_PREFIX)) else {
            exn::bail!(ErrorKind::NotFound(url.to_string()));
        };
        if let Some(status) = self.fetch_statuses.get(path) {
            exn::bail!(ErrorKind::from_status(*status, url, "injected failure"));
        }
        match self.file(path).await {
            Some(data) => Ok(data),
            None => exn::bail!(ErrorKind::NotFound(url.to_string())),
        }
    }

    fn can_commit(&self) -> bool {
        self.credentials
    }

    async fn commit(&self, commit: Commit) -> Result<CommitInfo> {
        if !self.credentials {
            exn::bail!(ErrorKind::PermissionDenied(self.repository.to_string()));
        }
        if let Some((status, message)) = &self.commit_rejection {
            exn::bail!(ErrorKind::Http { status: *status, message: message.clone() });
        }
        {
            let mut guard = self.storage.write().await;
            for op in &commit.operations {
                let data = op.bytes().to_vec();
                match guard.iter_mut().find(|(existing, _)| *existing == op.path) {
                    Some((_, existing)) => *existing = data,
                    None => guard.push((op.path.clone(), data)),
                }
            }
        }
        let mut commits = self.commits.write().await;
        commits.push(commit);
        Ok(CommitInfo {
            commit_url: Some(format!("mock://commit/{}", commits.len())),
            commit_oid: Some(format!("{:040x}", commits.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommitOperation;

    #[tokio::test]
    async fn test_list_yields_directories_before_files() {
        let backend = MockBackend::with_files([("Alpha/B/01.png", "a"), ("Alpha/02.png", "b"), ("loose.png", "c")]);
        let entries = backend.list().await.unwrap();
        assert_eq!(
            entries,
            vec![
                ListEntry::directory("Alpha"),
                ListEntry::directory("Alpha/B"),
                ListEntry::file("Alpha/B/01.png"),
                ListEntry::file("Alpha/02.png"),
                ListEntry::file("loose.png"),
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_failure() {
        let backend = MockBackend::default().with_listing_failure(ErrorKind::Network("offline".to_string()));
        let err = backend.list().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
    }

    #[tokio::test]
    async fn test_fetch_raw() {
        let backend = MockBackend::with_files([("Alpha/metadata.json", "{}")]);
        let url = backend.raw_url("Alpha/metadata.json").unwrap();
        assert_eq!(backend.fetch_raw(&url).await.unwrap(), b"{}");
        assert_eq!(backend.fetched().await, vec![url]);
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let backend = MockBackend::default();
        let url = backend.raw_url("missing.json").unwrap();
        let err = backend.fetch_raw(&url).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_fetch_status() {
        let backend = MockBackend::with_files([("Alpha/metadata.json", "{}")]).with_fetch_status("Alpha/metadata.json", 500);
        let url = backend.raw_url("Alpha/metadata.json").unwrap();
        let err = backend.fetch_raw(&url).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_commit_applies_operations() {
        let backend = MockBackend::with_files([("Alpha/01.png", "old")]);
        let mut commit = Commit::new("update");
        commit.push(CommitOperation::binary("Alpha/01.png", b"new".to_vec()).unwrap());
        commit.push(CommitOperation::text("Alpha/metadata.json", "{}").unwrap());
        let info = backend.commit(commit).await.unwrap();
        assert!(info.commit_oid.is_some());
        assert_eq!(backend.file("Alpha/01.png").await.unwrap(), b"new");
        assert_eq!(backend.file("Alpha/metadata.json").await.unwrap(), b"{}");
        assert_eq!(backend.commits().await.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_rejection() {
        let backend = MockBackend::default().with_commit_rejection(409, "conflict");
        let err = backend.commit(Commit::new("x")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Http { status: 409, message: "conflict".to_string() });
        assert!(backend.commits().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_without_credentials() {
        let backend = MockBackend::default().without_credentials();
        assert!(!backend.can_commit());
        let err = backend.commit(Commit::new("x")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
