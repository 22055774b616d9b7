//! Book models.
//!
//! [`BookMetadata`] is the document stored next to a book's pages;
//! [`BookEntry`] is what an indexing pass derives from a listing.

use bookshelf_storage::RemoteFile;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Page turning direction of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left to right.
    Ltr,
    /// Right to left (manga).
    Rtl,
}
impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}
impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptive metadata stored as `metadata.json` inside a book's folder.
///
/// Every field is optional. Unknown keys are ignored when reading, and so is
/// any known key whose value has the wrong type (a `warn` is logged and the
/// rest of the document is kept). Absent fields are left out when writing;
/// fields are always written in declaration order so the document is stable
/// across uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// In authored order; may contain duplicates.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Suffix of the page path to use as the cover (usually a file name).
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Uploader's X (Twitter) handle.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub x_id: Option<String>,
    /// Where the images were generated, if anywhere.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub generation_url: Option<String>,
}
impl BookMetadata {
    /// Parse a metadata document.
    ///
    /// Fails only when the body is not JSON or not a JSON object.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom("metadata document is not a JSON object"));
        }
        serde_json::from_value(value)
    }

    /// Render the metadata document: pretty-printed with two-space
    /// indentation, non-ASCII text kept as-is.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Split a comma-separated tag list, trimming each tag and dropping
    /// empty ones.
    ///
    /// ```
    /// use bookshelf_library::BookMetadata;
    /// assert_eq!(BookMetadata::parse_tags(" manga, 4koma,,  "), vec!["manga", "4koma"]);
    /// ```
    pub fn parse_tags(input: &str) -> Vec<String> {
        input.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
    }

    /// Tags with duplicates removed, keeping first occurrence order.
    pub fn display_tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tags
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|tag| seen.insert(*tag))
            .collect()
    }

    /// The X handle without a leading `@`.
    pub fn x_handle(&self) -> Option<&str> {
        self.x_id.as_deref().map(|id| id.trim().trim_start_matches('@')).filter(|id| !id.is_empty())
    }

    /// Declared cover suffix, ignoring blank values.
    pub(crate) fn cover_suffix(&self) -> Option<&str> {
        self.cover.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Read one metadata field, turning a value of the wrong type into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring metadata field with an unexpected value");
            Ok(None)
        },
    }
}

/// A book as displayed: its folder, ordered pages, cover and metadata.
///
/// # Invariants
/// - `pages` is never empty and is sorted by path.
/// - `cover` is always one of `pages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntry {
    pub title: String,
    pub folder_name: String,
    pub cover: RemoteFile,
    pub pages: Vec<RemoteFile>,
    pub metadata: Option<BookMetadata>,
}
impl BookEntry {
    /// Assemble an entry from a group's pages, or `None` if there are no
    /// pages at all.
    ///
    /// Pages are sorted by path (byte-wise). The cover is the first page
    /// whose path ends with the metadata's `cover` value, falling back to the
    /// first page when nothing is declared or nothing matches. The title
    /// falls back to the folder name.
    pub fn assemble(
        folder_name: impl Into<String>,
        mut pages: Vec<RemoteFile>,
        metadata: Option<BookMetadata>,
    ) -> Option<Self> {
        let folder_name = folder_name.into();
        pages.sort_by(|a, b| a.path.cmp(&b.path));
        let declared = metadata.as_ref().and_then(BookMetadata::cover_suffix);
        let cover = declared
            .and_then(|suffix| pages.iter().find(|page| page.path.ends_with(suffix)))
            .or_else(|| pages.first())?
            .clone();
        if let Some(suffix) = declared
            && !cover.path.ends_with(suffix)
        {
            tracing::debug!(folder = %folder_name, cover = suffix, "Declared cover not found; using first page");
        }
        let title = metadata
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| folder_name.clone());
        Some(Self { title, folder_name, cover, pages, metadata })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.metadata.as_ref().and_then(|m| m.direction)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.metadata.as_ref().map(BookMetadata::display_tags).unwrap_or_default()
    }
}
