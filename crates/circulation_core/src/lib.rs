//! Core circulation records for a small library.
//! This crate owns the bookkeeping invariants for books, borrowers,
//! librarians and loans.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::asset::{AssetRef, BOOK_COVER_DIR, LIBRARIAN_PHOTO_DIR};
pub use model::book::Book;
pub use model::borrower::{Borrower, UserType, USER_TYPE_CHOICES};
pub use model::librarian::Librarian;
pub use model::loan::{
    default_due_date, LoanId, LoanRecord, LoanState, NewLoan, DEFAULT_LOAN_PERIOD_DAYS,
};
pub use model::ValidationError;
pub use repo::book_repo::{BookListQuery, BookRepository, SqliteBookRepository};
pub use repo::borrower_repo::{BorrowerRepository, SqliteBorrowerRepository};
pub use repo::error::{EntityKind, ReferenceError, RepoError, RepoResult};
pub use repo::librarian_repo::{LibrarianRepository, SqliteLibrarianRepository};
pub use repo::loan_repo::{LoanDetails, LoanListQuery, LoanRepository, SqliteLoanRepository};
pub use repo::Page;
pub use service::catalog_service::CatalogService;
pub use service::loan_service::LoanService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
