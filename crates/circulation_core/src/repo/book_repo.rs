//! Book repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist catalog entries and apply availability normalization on write.
//! - Refuse deletes of books that loan records still reference.
//!
//! # Invariants
//! - `create_book` stores `quantity_available = quantity_total`.
//! - Every write clamps `quantity_available` into `[0, quantity_total]`.
//! - Normal edits never write `loan_count`; only `set_loan_count` does.

use crate::model::asset::AssetRef;
use crate::model::book::Book;
use crate::repo::error::{
    map_delete_error, map_insert_error, EntityKind, ReferenceError, RepoError, RepoResult,
};
use crate::repo::{count_loans_by, LoanRefColumn, Page};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const BOOK_SELECT_SQL: &str = "SELECT
    isbn,
    title,
    author,
    year_published,
    quantity_total,
    quantity_available,
    genre,
    image_cover,
    loan_count
FROM books";

/// Query options for listing books.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookListQuery {
    /// Exact genre match.
    pub genre: Option<String>,
    /// Exact author match.
    pub author: Option<String>,
    pub page: Page,
}

/// Repository interface for catalog CRUD.
pub trait BookRepository {
    /// Inserts a new book and returns the stored (normalized) record.
    fn create_book(&self, book: &Book) -> RepoResult<Book>;
    /// Updates editable fields by isbn and returns the stored record.
    fn update_book(&self, book: &Book) -> RepoResult<Book>;
    fn get_book(&self, isbn: &str) -> RepoResult<Option<Book>>;
    /// Lists books ordered by title, then isbn.
    fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>>;
    /// Deletes a book with no loan records.
    fn delete_book(&self, isbn: &str) -> RepoResult<()>;
    /// Direct write path for the otherwise read-only loan counter.
    fn set_loan_count(&self, isbn: &str, loan_count: u32) -> RepoResult<()>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn create_book(&self, book: &Book) -> RepoResult<Book> {
        book.validate()?;
        let mut stored = book.clone();
        stored.prepare_for_create();
        normalize_for_write(&mut stored);

        self.conn
            .execute(
                "INSERT INTO books (
                    isbn,
                    title,
                    author,
                    year_published,
                    quantity_total,
                    quantity_available,
                    genre,
                    image_cover,
                    loan_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    stored.isbn.as_str(),
                    stored.title.as_str(),
                    stored.author.as_str(),
                    stored.year_published,
                    stored.quantity_total,
                    stored.quantity_available,
                    stored.genre.as_deref(),
                    stored.image_cover.as_ref().map(AssetRef::as_str),
                    stored.loan_count,
                ],
            )
            .map_err(|err| map_insert_error(err, EntityKind::Book, "isbn", &stored.isbn))?;

        Ok(stored)
    }

    fn update_book(&self, book: &Book) -> RepoResult<Book> {
        book.validate()?;
        let mut stored = book.clone();
        normalize_for_write(&mut stored);

        let changed = self.conn.execute(
            "UPDATE books
             SET
                title = ?2,
                author = ?3,
                year_published = ?4,
                quantity_total = ?5,
                quantity_available = ?6,
                genre = ?7,
                image_cover = ?8
             WHERE isbn = ?1;",
            params![
                stored.isbn.as_str(),
                stored.title.as_str(),
                stored.author.as_str(),
                stored.year_published,
                stored.quantity_total,
                stored.quantity_available,
                stored.genre.as_deref(),
                stored.image_cover.as_ref().map(AssetRef::as_str),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Book, stored.isbn.as_str()));
        }

        // loan_count is not part of the edit; report the persisted value.
        stored.loan_count = self.conn.query_row(
            "SELECT loan_count FROM books WHERE isbn = ?1;",
            [stored.isbn.as_str()],
            |row| row.get(0),
        )?;

        Ok(stored)
    }

    fn get_book(&self, isbn: &str) -> RepoResult<Option<Book>> {
        let book = self
            .conn
            .query_row(
                &format!("{BOOK_SELECT_SQL} WHERE isbn = ?1;"),
                [isbn],
                parse_book_row,
            )
            .optional()?;
        Ok(book)
    }

    fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>> {
        let mut sql = format!("{BOOK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(genre) = &query.genre {
            sql.push_str(" AND genre = ?");
            bind_values.push(Value::Text(genre.clone()));
        }

        if let Some(author) = &query.author {
            sql.push_str(" AND author = ?");
            bind_values.push(Value::Text(author.clone()));
        }

        sql.push_str(" ORDER BY title ASC, isbn ASC");
        query.page.apply(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let books = stmt
            .query_map(params_from_iter(bind_values), parse_book_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    fn delete_book(&self, isbn: &str) -> RepoResult<()> {
        let loans = count_loans_by(self.conn, LoanRefColumn::Book, isbn)?;
        if loans > 0 {
            return Err(ReferenceError::Protected {
                entity: EntityKind::Book,
                key: isbn.to_string(),
                loans,
            }
            .into());
        }

        let changed = self
            .conn
            .execute("DELETE FROM books WHERE isbn = ?1;", [isbn])
            .map_err(|err| map_delete_error(err, EntityKind::Book, isbn))?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Book, isbn));
        }

        Ok(())
    }

    fn set_loan_count(&self, isbn: &str, loan_count: u32) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE books SET loan_count = ?2 WHERE isbn = ?1;",
            params![isbn, loan_count],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Book, isbn));
        }

        Ok(())
    }
}

fn normalize_for_write(book: &mut Book) {
    let requested = book.quantity_available;
    if book.normalize_availability() {
        debug!(
            "event=book_available_clamped module=repo isbn={} requested={} stored={} total={}",
            book.isbn, requested, book.quantity_available, book.quantity_total
        );
    }
}

fn parse_book_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get("isbn")?,
        title: row.get("title")?,
        author: row.get("author")?,
        year_published: row.get("year_published")?,
        quantity_total: row.get("quantity_total")?,
        quantity_available: row.get("quantity_available")?,
        genre: row.get("genre")?,
        image_cover: row.get::<_, Option<String>>("image_cover")?.map(AssetRef::new),
        loan_count: row.get("loan_count")?,
    })
}
