//! Content indexing.
//!
//! Turns a flat repository listing into [`BookEntry`](crate::BookEntry)
//! values. Every top-level folder is one book; images sitting at the
//! repository root are collected into the [`FALLBACK_GROUP`](crate::FALLBACK_GROUP).
//!
//! [`group_files`] is the pure half of the work and never touches the
//! network. [`index_stream`] drives a full pass against a backend, resolving
//! each book's metadata one group at a time, and [`index`] collects it.

pub mod error;
mod group;
mod stream;

pub use self::group::{Group, group_files};
pub use self::stream::{IndexEvent, index, index_stream};
