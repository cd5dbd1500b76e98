//! Opaque references to binary assets kept in external storage.
//!
//! Only the reference is persisted; asset bytes never pass through core.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Upload prefix for librarian photos.
pub const LIBRARIAN_PHOTO_DIR: &str = "librarians/";
/// Upload prefix for book cover images.
pub const BOOK_COVER_DIR: &str = "book_covers/";

/// Pointer into external file storage (for example `book_covers/a.png`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    /// Wraps an existing storage path as-is.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Builds a reference for `file_name` under an upload prefix.
    ///
    /// Leading slashes in `file_name` are dropped so the result always stays
    /// inside `dir`.
    pub fn upload(dir: &str, file_name: &str) -> Self {
        Self(format!("{dir}{}", file_name.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AssetRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
