pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::RemoteStore;
pub use crate::models::{
    Commit, CommitInfo, CommitOperation, Content, Encoding, EntryKind, ListEntry, RemoteFile, RepoId, RepoKind,
};
pub use crate::path::{validate as validate_path, validate_segment};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn RemoteStore + Send + Sync>;
