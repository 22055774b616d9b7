pub mod commit;
pub mod index;
pub mod metadata;
mod models;
mod shelf;

pub use crate::models::{BookEntry, BookMetadata, Direction};
pub use crate::shelf::Bookshelf;

/// File extensions (lower-case) treated as page images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
/// Exact file name of the per-book metadata document.
pub const METADATA_FILE_NAME: &str = "metadata.json";
/// Group that collects images sitting at the repository root.
pub const FALLBACK_GROUP: &str = "Misc";
/// Repository-level attributes file carrying large-file tracking rules.
pub const ATTRIBUTES_FILE: &str = ".gitattributes";

/// Whether `file_name` has one of the [`IMAGE_EXTENSIONS`], ignoring case.
pub fn is_image(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
}
