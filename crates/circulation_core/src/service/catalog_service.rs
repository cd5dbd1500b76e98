//! Catalog use-case service.
//!
//! # Responsibility
//! - Provide book add/edit/remove entry points for catalog management.
//! - Log catalog writes as `key=value` events.
//!
//! # Invariants
//! - Availability clamping is reported, never turned into an error.

use crate::model::book::Book;
use crate::repo::book_repo::{BookListQuery, BookRepository};
use crate::repo::error::{RepoError, RepoResult};
use log::{error, info, warn};

/// Use-case service wrapper for catalog operations.
pub struct CatalogService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a book with `copies` copies, all of them available.
    pub fn add_book(
        &self,
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        copies: u32,
    ) -> RepoResult<Book> {
        let mut book = Book::new(title, author, isbn);
        book.quantity_total = copies;
        self.create_book(&book)
    }

    /// Creates a prepared book record. Availability is reset to the total.
    pub fn create_book(&self, book: &Book) -> RepoResult<Book> {
        match self.repo.create_book(book) {
            Ok(stored) => {
                info!(
                    "event=book_create module=catalog status=ok isbn={} total={}",
                    stored.isbn, stored.quantity_total
                );
                Ok(stored)
            }
            Err(err) => {
                log_write_error("book_create", &book.isbn, &err);
                Err(err)
            }
        }
    }

    /// Saves edits and returns the stored record, which may differ from the
    /// input when availability had to be clamped.
    pub fn update_book(&self, book: &Book) -> RepoResult<Book> {
        match self.repo.update_book(book) {
            Ok(stored) => {
                info!(
                    "event=book_update module=catalog status=ok isbn={} available={} total={} clamped={}",
                    stored.isbn,
                    stored.quantity_available,
                    stored.quantity_total,
                    stored.quantity_available != book.quantity_available
                );
                Ok(stored)
            }
            Err(err) => {
                log_write_error("book_update", &book.isbn, &err);
                Err(err)
            }
        }
    }

    pub fn get_book(&self, isbn: &str) -> RepoResult<Option<Book>> {
        self.repo.get_book(isbn)
    }

    pub fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>> {
        self.repo.list_books(query)
    }

    /// Removes a book. Refused while loan records reference it.
    pub fn remove_book(&self, isbn: &str) -> RepoResult<()> {
        match self.repo.delete_book(isbn) {
            Ok(()) => {
                info!("event=book_delete module=catalog status=ok isbn={isbn}");
                Ok(())
            }
            Err(err) => {
                log_write_error("book_delete", isbn, &err);
                Err(err)
            }
        }
    }

    /// Overwrites the loan counter for callers that maintain it externally.
    pub fn set_loan_count(&self, isbn: &str, loan_count: u32) -> RepoResult<()> {
        self.repo.set_loan_count(isbn, loan_count)?;
        info!(
            "event=book_loan_count_set module=catalog status=ok isbn={isbn} loan_count={loan_count}"
        );
        Ok(())
    }
}

fn log_write_error(event: &str, isbn: &str, err: &RepoError) {
    match err {
        RepoError::Db(_) | RepoError::InvalidData(_) => error!(
            "event={event} module=catalog status=error isbn={isbn} error_code=storage_failed error={err}"
        ),
        _ => warn!("event={event} module=catalog status=rejected isbn={isbn} error={err}"),
    }
}
