//! Book catalog record.
//!
//! # Responsibility
//! - Define the catalog entry and its copy-count bookkeeping.
//! - Normalize availability on every write.
//!
//! # Invariants
//! - After `normalize_availability`, `0 <= quantity_available <= quantity_total`.
//! - A freshly created book starts with every copy available.
//! - Out-of-range availability is clamped, never rejected. Callers may see
//!   their submitted value changed on save; this lenient behavior is part of
//!   the contract.
//! - `loan_count` is never touched by any rule here. Loans do not move the
//!   available count either; inventory adjustment is left to the caller.

use crate::model::asset::AssetRef;
use crate::model::{check_optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const TITLE_MAX: usize = 255;
pub const AUTHOR_MAX: usize = 255;
pub const ISBN_MAX: usize = 20;
pub const GENRE_MAX: usize = 100;

/// Catalog entry keyed by `isbn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    /// Unique catalog key.
    pub isbn: String,
    pub year_published: Option<u32>,
    pub quantity_total: u32,
    /// Signed so that out-of-range input can be represented before clamping.
    pub quantity_available: i64,
    pub genre: Option<String>,
    pub image_cover: Option<AssetRef>,
    /// Read-only for normal edits; see `BookRepository::set_loan_count`.
    pub loan_count: u32,
}

impl Book {
    /// Creates a book holding one copy, all copies available, never loaned.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            year_published: None,
            quantity_total: 1,
            quantity_available: 1,
            genre: None,
            image_cover: None,
            loan_count: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("isbn", &self.isbn, ISBN_MAX)?;
        require_text("title", &self.title, TITLE_MAX)?;
        require_text("author", &self.author, AUTHOR_MAX)?;
        check_optional_text("genre", self.genre.as_deref(), GENRE_MAX)
    }

    /// Resets derived counters for a first save: every copy is on the shelf
    /// and nothing has been lent yet.
    pub fn prepare_for_create(&mut self) {
        self.quantity_available = i64::from(self.quantity_total);
        self.loan_count = 0;
    }

    /// Clamps `quantity_available` into `[0, quantity_total]`.
    ///
    /// Returns `true` when the value had to be corrected.
    pub fn normalize_availability(&mut self) -> bool {
        let clamped = self
            .quantity_available
            .clamp(0, i64::from(self.quantity_total));
        let changed = clamped != self.quantity_available;
        self.quantity_available = clamped;
        changed
    }
}

impl Display for Book {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.isbn)
    }
}
