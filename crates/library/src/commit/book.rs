use crate::commit::error::{ErrorKind, Result};
use crate::commit::folder::sanitize_folder_name;
use crate::models::BookMetadata;
use crate::{ATTRIBUTES_FILE, IMAGE_EXTENSIONS, METADATA_FILE_NAME, is_image};
use bookshelf_storage::{Commit, CommitOperation, validate_segment};
use exn::{OptionExt, ResultExt};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::instrument;

/// One page image of a new book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFile {
    /// Bytes already in memory, uploaded under `name`.
    Memory { name: String, bytes: Vec<u8> },
    /// A local file, uploaded under its own file name and read when the
    /// commit is built.
    Path(PathBuf),
}
impl PageFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memory { name: name.into(), bytes: bytes.into() }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// The name the page is stored under, if it has a usable one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Memory { name, .. } => Some(name.as_str()),
            Self::Path(path) => path.file_name().and_then(|name| name.to_str()),
        }
    }

    fn checked_name(&self) -> Result<&str> {
        let name = self.name().ok_or_raise(|| ErrorKind::InvalidFileName(self.describe()))?;
        if name == METADATA_FILE_NAME || validate_segment(name).is_err() {
            exn::bail!(ErrorKind::InvalidFileName(name.to_string()));
        }
        Ok(name)
    }

    async fn read(self) -> Result<Vec<u8>> {
        match self {
            Self::Memory { bytes, .. } => Ok(bytes),
            Self::Path(path) => {
                tokio::fs::read(&path).await.or_raise(|| ErrorKind::UnreadableFile(path.display().to_string()))
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Memory { name, .. } => name.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

/// Everything needed to upload one book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    /// Overrides the folder derived from the title.
    pub folder_name: Option<String>,
    pub metadata: BookMetadata,
    /// Pages, in reading order.
    pub files: Vec<PageFile>,
}
impl NewBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Default::default() }
    }

    pub fn with_folder_name(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = Some(folder_name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BookMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_file(mut self, file: PageFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = PageFile>) -> Self {
        self.files.extend(files);
        self
    }

    /// The folder the book will be written to.
    ///
    /// An explicit folder name must already be a single path segment; it is
    /// not sanitized.
    pub fn folder(&self) -> Result<String> {
        match &self.folder_name {
            Some(explicit) => match validate_segment(explicit) {
                Ok(valid) => Ok(valid),
                Err(_) => exn::bail!(ErrorKind::InvalidFolderName(explicit.clone())),
            },
            None => Ok(sanitize_folder_name(&self.title)),
        }
    }

    /// Check the book can be uploaded and return its folder name.
    ///
    /// Does no I/O: local page files are only read by [`build_commit`].
    pub fn validate(&self) -> Result<String> {
        if self.title.trim().is_empty() {
            exn::bail!(ErrorKind::MissingTitle);
        }
        if self.files.is_empty() {
            exn::bail!(ErrorKind::NoFiles);
        }
        let folder = self.folder()?;
        for file in &self.files {
            let name = file.checked_name()?;
            if !is_image(name) {
                tracing::warn!(%name, "Page is not an image and will not show up in the bookshelf");
            }
        }
        Ok(folder)
    }

    /// The metadata document as it will be written.
    ///
    /// A missing title is filled from the book title, exactly as given, and
    /// a missing cover from the first page's name.
    pub fn effective_metadata(&self) -> BookMetadata {
        let mut metadata = self.metadata.clone();
        if metadata.title.is_none() {
            metadata.title = Some(self.title.clone());
        }
        if metadata.cover.is_none() {
            metadata.cover = self.files.first().and_then(PageFile::name).map(str::to_string);
        }
        metadata
    }

    /// Summary line of the commit.
    pub fn summary(&self) -> String {
        format!("Add book \"{}\" ({} pages)", self.title.trim(), self.files.len())
    }
}

/// Contents of the repository-level `.gitattributes`.
///
/// Every image extension is tracked in both lower and upper case.
pub fn gitattributes() -> String {
    IMAGE_EXTENSIONS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
        .map(|ext| format!("*.{ext} filter=lfs diff=lfs merge=lfs -text\n"))
        .collect()
}

/// Assemble the commit for `book`.
///
/// Validates, reads local page files and encodes everything; nothing is
/// sent. Operations come out as `.gitattributes`, the metadata document,
/// then the pages in input order. Two pages with the same name both produce
/// an operation, and the later one wins remotely.
#[instrument(skip(book), fields(title = %book.title, files = book.files.len()))]
pub async fn build_commit(book: NewBook) -> Result<Commit> {
    let folder = book.validate()?;
    let summary = book.summary();
    let document = book.effective_metadata().to_json().or_raise(|| ErrorKind::Serialize)?;

    let mut commit = Commit::new(summary);
    commit.push(
        CommitOperation::text(ATTRIBUTES_FILE, gitattributes())
            .or_raise(|| ErrorKind::InvalidFileName(ATTRIBUTES_FILE.to_string()))?,
    );
    commit.push(
        CommitOperation::text(format!("{folder}/{METADATA_FILE_NAME}"), document)
            .or_raise(|| ErrorKind::InvalidFolderName(folder.clone()))?,
    );

    let mut seen = HashSet::new();
    for file in book.files {
        let name = file.checked_name()?.to_string();
        if !seen.insert(name.clone()) {
            tracing::warn!(%name, "Duplicate page name; the later file overwrites the earlier one");
        }
        let bytes = file.read().await?;
        tracing::debug!(%name, bytes = bytes.len(), "Adding page");
        commit.push(
            CommitOperation::binary(format!("{folder}/{name}"), bytes)
                .or_raise(|| ErrorKind::InvalidFileName(name.clone()))?,
        );
    }
    tracing::debug!(operations = commit.operations.len(), bytes = commit.payload_size(), "Commit assembled");
    Ok(commit)
}
