//! Storage models.
//!
//! These types are the request/response contract between the bookshelf core
//! and a remote content store: what a listing yields, what a commit carries,
//! and how a repository is identified.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A listed file together with the address it can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Repository-relative path, unique within one listing snapshot.
    pub path: String,
    /// Resolved, fetchable address of the file.
    pub url: String,
}
impl RemoteFile {
    pub fn new(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self { path: path.into(), url: url.into() }
    }

    /// The last path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lower-cased extension of the file name, if it has one.
    pub fn extension(&self) -> Option<String> {
        self.file_name().rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// What kind of object a listing entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    #[serde(other)]
    Unknown,
}

/// One raw item of a repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}
impl ListEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::File }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::Directory }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// The three flavours of Hub repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoKind {
    Model,
    Dataset,
    Space,
}
impl RepoKind {
    /// Prefix used in browser-facing URLs (`resolve`/`raw`). Models have none.
    pub fn url_prefix(&self) -> &'static str {
        match self {
            Self::Model => "",
            Self::Dataset => "datasets/",
            Self::Space => "spaces/",
        }
    }

    /// Collection name used in API URLs (`/api/<collection>/...`).
    pub fn api_collection(&self) -> &'static str {
        match self {
            Self::Model => "models",
            Self::Dataset => "datasets",
            Self::Space => "spaces",
        }
    }
}

/// Identifies one repository on the remote store.
///
/// Parsed from the same notation the Hub uses in URLs: a leading `datasets/`
/// or `spaces/` selects the kind, anything else is a model repository.
///
/// ```
/// use bookshelf_storage::{RepoId, RepoKind};
///
/// let repo: RepoId = "datasets/MakiAi/bookshelf-db".parse().unwrap();
/// assert_eq!(repo.kind, RepoKind::Dataset);
/// assert_eq!(repo.name, "MakiAi/bookshelf-db");
/// assert_eq!(repo.to_string(), "datasets/MakiAi/bookshelf-db");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub kind: RepoKind,
    /// `owner/name` (or a bare legacy `name`).
    pub name: String,
}
impl RepoId {
    pub fn new(kind: RepoKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    pub fn dataset(name: impl Into<String>) -> Self {
        Self::new(RepoKind::Dataset, name)
    }
}
impl FromStr for RepoId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        let (kind, name) = match trimmed.split_once('/') {
            Some(("datasets", rest)) => (RepoKind::Dataset, rest),
            Some(("spaces", rest)) => (RepoKind::Space, rest),
            Some(("models", rest)) => (RepoKind::Model, rest),
            _ => (RepoKind::Model, trimmed),
        };
        let segments: Vec<&str> = name.split('/').collect();
        let valid = matches!(segments.len(), 1 | 2)
            && segments.iter().all(|seg| !seg.is_empty() && *seg != "." && *seg != "..");
        if !valid {
            exn::bail!(ErrorKind::InvalidRepository(s.to_string()));
        }
        Ok(Self::new(kind, name))
    }
}
impl Display for RepoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}", self.kind.url_prefix(), self.name)
    }
}

/// How the content of a [`CommitOperation`] is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "utf-8")]
    Utf8,
}

/// Payload of a single commit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

/// Create-or-overwrite of one file as part of a [`Commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOperation {
    pub path: String,
    pub content: Content,
}
impl CommitOperation {
    /// A UTF-8 text file. The path is validated.
    pub fn text(path: impl AsRef<str>, text: impl Into<String>) -> Result<Self> {
        Ok(Self { path: validate_path(path)?, content: Content::Text(text.into()) })
    }

    /// A binary file, sent base64-encoded. The path is validated.
    pub fn binary(path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self { path: validate_path(path)?, content: Content::Binary(bytes.into()) })
    }

    pub fn encoding(&self) -> Encoding {
        match self.content {
            Content::Text(_) => Encoding::Utf8,
            Content::Binary(_) => Encoding::Base64,
        }
    }

    /// Content as it appears on the wire for [`encoding()`](Self::encoding).
    pub fn encoded_content(&self) -> Cow<'_, str> {
        match &self.content {
            Content::Text(text) => Cow::Borrowed(text),
            Content::Binary(bytes) => Cow::Owned(STANDARD.encode(bytes)),
        }
    }

    /// Raw bytes the file will contain once applied.
    pub fn bytes(&self) -> &[u8] {
        match &self.content {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

/// An ordered set of operations applied atomically under one summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub summary: String,
    pub description: Option<String>,
    pub operations: Vec<CommitOperation>,
}
impl Commit {
    pub fn new(summary: impl Into<String>) -> Self {
        Self { summary: summary.into(), description: None, operations: Vec::new() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn push(&mut self, operation: CommitOperation) {
        self.operations.push(operation);
    }

    /// Total payload size in bytes, before encoding.
    pub fn payload_size(&self) -> usize {
        self.operations.iter().map(CommitOperation::len).sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|op| op.path.as_str())
    }
}

/// What the remote store reports back about an applied commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub commit_url: Option<String>,
    pub commit_oid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("datasets/MakiAi/bookshelf-db", RepoKind::Dataset, "MakiAi/bookshelf-db")]
    #[case("spaces/owner/app", RepoKind::Space, "owner/app")]
    #[case("models/owner/model", RepoKind::Model, "owner/model")]
    #[case("owner/model", RepoKind::Model, "owner/model")]
    #[case("gpt2", RepoKind::Model, "gpt2")]
    #[case(" /datasets/a/b/ ", RepoKind::Dataset, "a/b")]
    fn test_parse_repo(#[case] input: &str, #[case] kind: RepoKind, #[case] name: &str) {
        let repo: RepoId = input.parse().unwrap();
        assert_eq!(repo.kind, kind);
        assert_eq!(repo.name, name);
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("a/b/c")]
    #[case("datasets/a//b")]
    #[case("datasets/../b")]
    fn test_parse_repo_invalid(#[case] input: &str) {
        assert!(input.parse::<RepoId>().is_err());
    }

    #[test]
    fn test_repo_display_round_trip() {
        for input in ["datasets/a/b", "spaces/a/b", "a/b"] {
            let repo: RepoId = input.parse().unwrap();
            assert_eq!(repo.to_string(), input);
        }
    }

    #[test]
    fn test_list_entry_from_hub_json() {
        let json = r#"[
            {"type":"directory","oid":"abc","size":0,"path":"Alpha"},
            {"type":"file","oid":"def","size":12,"path":"Alpha/01.png","lfs":{"oid":"x","size":12}}
        ]"#;
        let entries: Vec<ListEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries, vec![ListEntry::directory("Alpha"), ListEntry::file("Alpha/01.png")]);
    }

    #[test]
    fn test_operation_encoding() {
        let text = CommitOperation::text("Alpha/metadata.json", "{}").unwrap();
        assert_eq!(text.encoding(), Encoding::Utf8);
        assert_eq!(text.encoded_content(), "{}");

        let binary = CommitOperation::binary("Alpha/01.png", vec![0x89, b'P', b'N', b'G']).unwrap();
        assert_eq!(binary.encoding(), Encoding::Base64);
        assert_eq!(binary.encoded_content(), "iVBORw==");
        assert_eq!(binary.len(), 4);
    }

    #[test]
    fn test_operation_rejects_traversal() {
        assert!(CommitOperation::text("../escape", "").is_err());
        assert!(CommitOperation::binary("", vec![]).is_err());
    }

    #[test]
    fn test_remote_file_parts() {
        let file = RemoteFile::new("Alpha/B/Cover.JPG", "https://example.test/x");
        assert_eq!(file.file_name(), "Cover.JPG");
        assert_eq!(file.extension().as_deref(), Some("jpg"));
        assert_eq!(RemoteFile::new("README", "").extension(), None);
    }

    #[test]
    fn test_encoding_serde() {
        assert_eq!(serde_json::to_string(&Encoding::Utf8).unwrap(), r#""utf-8""#);
        assert_eq!(serde_json::to_string(&Encoding::Base64).unwrap(), r#""base64""#);
    }
}
