//! Book uploads.
//!
//! A new book becomes exactly one commit against the remote store:
//!
//! 1. `.gitattributes` at the repository root, routing image types through
//!    large-file storage.
//! 2. `<folder>/metadata.json`, pretty-printed.
//! 3. One base64 operation per page at `<folder>/<file name>`, in input
//!    order.
//!
//! [`build_commit`] assembles the payload without touching the network,
//! [`submit`] sends it, and [`add_book`] does both after checking that the
//! backend can write at all.

mod book;
pub mod error;
mod folder;
mod submit;

pub use self::book::{NewBook, PageFile, build_commit, gitattributes};
pub use self::folder::sanitize_folder_name;
pub use self::submit::{add_book, submit};
