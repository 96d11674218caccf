//! Private file system nodes and path operations
//!
//! ```text
//!             PrivateDirectory ("root")
//!              /              \
//!        PrivateLink        PrivateLink       names are plaintext only
//!         "docs"             "notes.txt"      inside the encrypted parent
//!            |                    |
//!     PrivateDirectory       PrivateFile
//! ```
//!
//! Every node value is immutable; mutations produce a fresh root directory
//! and a fresh forest snapshot, committed bottom-up so a failure anywhere
//! leaves the inputs untouched.

mod content;
mod directory;
mod file;
mod metadata;
mod node;

pub use content::{
    encrypt_and_store, fetch_and_decrypt, ContentError, ContentManifest, INLINE_CONTENT_LIMIT,
    MAX_BLOCK_SIZE,
};
pub use directory::{PrivateDirectory, PrivateOpResult};
pub use file::{FileContent, PrivateFile};
pub use metadata::Metadata;
pub use node::{PrivateLink, PrivateNode};

use crate::crypto::KeyError;
use crate::linked_data::CodecError;
use crate::store::BlockStoreError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("operation requires a non-empty path")]
    InvalidPath,
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("path already exists: {0}")]
    AlreadyExists(String),
    #[error("cannot move '{from}' into itself at '{to}'")]
    MoveIntoSelf { from: String, to: String },
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("block store error: {0}")]
    Store(#[from] BlockStoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("default error: {0}")]
    Default(#[from] anyhow::Error),
}

pub(crate) fn join_path(path: &[String]) -> String {
    path.join("/")
}
