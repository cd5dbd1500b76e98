//! Loan record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist loan transactions with resolved date defaults.
//! - Check book/borrower references before every loan write.
//! - Serve loan listings in `loan_date DESC, id ASC` order.
//!
//! # Invariants
//! - Loan writes never touch `books` rows; availability is not adjusted.
//! - `update_loan` never changes a return date; only `close_loan` sets it,
//!   and only once.
//! - Loan ids are assigned on create and never rewritten.

use crate::model::loan::{last_storable_date, LoanId, LoanRecord, NewLoan};
use crate::model::ValidationError;
use crate::repo::error::{
    constraint_kind, map_decode_error, ConstraintKind, EntityKind, ReferenceError, RepoError,
    RepoResult,
};
use crate::repo::Page;
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const LOAN_SELECT_SQL: &str = "SELECT
    id,
    book_isbn,
    borrower_user_id,
    loan_date,
    due_date,
    return_date
FROM loan_records";

const LOAN_DETAILS_SELECT_SQL: &str = "SELECT
    loan_records.id AS id,
    loan_records.book_isbn AS book_isbn,
    loan_records.borrower_user_id AS borrower_user_id,
    loan_records.loan_date AS loan_date,
    loan_records.due_date AS due_date,
    loan_records.return_date AS return_date,
    books.title AS book_title,
    borrowers.name AS borrower_name
FROM loan_records
JOIN books ON books.isbn = loan_records.book_isbn
JOIN borrowers ON borrowers.user_id = loan_records.borrower_user_id";

const LOAN_ORDER_SQL: &str = " ORDER BY loan_date DESC, id ASC";

/// Query options for loan listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanListQuery {
    pub book_isbn: Option<String>,
    pub borrower_user_id: Option<String>,
    /// Only loans without a return date.
    pub open_only: bool,
    pub page: Page,
}

/// Loan joined with the titles a listing screen needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanDetails {
    pub record: LoanRecord,
    pub book_title: String,
    pub borrower_name: String,
}

impl Display for LoanDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' lent to {}", self.book_title, self.borrower_name)
    }
}

/// Repository interface for loan record operations.
pub trait LoanRepository {
    /// Resolves date defaults against `today`, assigns an id and inserts.
    fn create_loan(&self, loan: &NewLoan, today: NaiveDate) -> RepoResult<LoanRecord>;
    /// Rewrites references and loan/due dates of an existing loan. The
    /// stored return date must be passed back unchanged.
    fn update_loan(&self, record: &LoanRecord) -> RepoResult<()>;
    /// Sets the return date of an open loan.
    fn close_loan(&self, id: LoanId, return_date: NaiveDate) -> RepoResult<LoanRecord>;
    fn get_loan(&self, id: LoanId) -> RepoResult<Option<LoanRecord>>;
    fn list_loans(&self, query: &LoanListQuery) -> RepoResult<Vec<LoanRecord>>;
    /// Open loans whose due date is strictly before `today`.
    fn list_overdue_loans(&self, today: NaiveDate) -> RepoResult<Vec<LoanRecord>>;
    fn list_loan_details(&self, query: &LoanListQuery) -> RepoResult<Vec<LoanDetails>>;
    fn delete_loan(&self, id: LoanId) -> RepoResult<()>;
}

/// SQLite-backed loan repository.
pub struct SqliteLoanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLoanRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn ensure_references(&self, book_isbn: &str, borrower_user_id: &str) -> RepoResult<()> {
        if !self.exists("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ?1);", book_isbn)? {
            return Err(ReferenceError::MissingBook(book_isbn.to_string()).into());
        }
        if !self.exists(
            "SELECT EXISTS(SELECT 1 FROM borrowers WHERE user_id = ?1);",
            borrower_user_id,
        )? {
            return Err(ReferenceError::MissingBorrower(borrower_user_id.to_string()).into());
        }
        Ok(())
    }

    fn exists(&self, sql: &str, key: &str) -> RepoResult<bool> {
        let found: i64 = self.conn.query_row(sql, [key], |row| row.get(0))?;
        Ok(found == 1)
    }

    /// Re-reads references after a foreign-key failure to name the culprit.
    fn map_write_error(&self, err: rusqlite::Error, record: &LoanRecord) -> RepoError {
        if constraint_kind(&err) == Some(ConstraintKind::ForeignKey) {
            if let Err(reference_err) =
                self.ensure_references(&record.book_isbn, &record.borrower_user_id)
            {
                return reference_err;
            }
        }
        err.into()
    }

    fn query_loans(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<LoanRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let loans = stmt
            .query_map(params_from_iter(bind_values), parse_loan_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_decode_error)?;
        Ok(loans)
    }
}

impl LoanRepository for SqliteLoanRepository<'_> {
    fn create_loan(&self, loan: &NewLoan, today: NaiveDate) -> RepoResult<LoanRecord> {
        self.ensure_references(&loan.book_isbn, &loan.borrower_user_id)?;
        let record = loan.clone().into_record(today)?;

        self.conn
            .execute(
                "INSERT INTO loan_records (
                    id,
                    book_isbn,
                    borrower_user_id,
                    loan_date,
                    due_date,
                    return_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    record.id.to_string(),
                    record.book_isbn.as_str(),
                    record.borrower_user_id.as_str(),
                    record.loan_date,
                    record.due_date,
                    record.return_date,
                ],
            )
            .map_err(|err| self.map_write_error(err, &record))?;

        Ok(record)
    }

    fn update_loan(&self, record: &LoanRecord) -> RepoResult<()> {
        let existing = self
            .get_loan(record.id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::LoanRecord, record.id.to_string()))?;
        match (existing.return_date, record.return_date) {
            (Some(_), None) => return Err(ValidationError::ReopenLoan.into()),
            (Some(returned_on), Some(requested)) if requested != returned_on => {
                return Err(ValidationError::LoanAlreadyClosed { returned_on }.into());
            }
            (None, Some(_)) => return Err(ValidationError::ReturnOutsideClose.into()),
            _ => {}
        }
        record.validate_dates()?;
        self.ensure_references(&record.book_isbn, &record.borrower_user_id)?;

        let changed = self
            .conn
            .execute(
                "UPDATE loan_records
                 SET
                    book_isbn = ?2,
                    borrower_user_id = ?3,
                    loan_date = ?4,
                    due_date = ?5
                 WHERE id = ?1;",
                params![
                    record.id.to_string(),
                    record.book_isbn.as_str(),
                    record.borrower_user_id.as_str(),
                    record.loan_date,
                    record.due_date,
                ],
            )
            .map_err(|err| self.map_write_error(err, record))?;

        if changed == 0 {
            return Err(RepoError::not_found(
                EntityKind::LoanRecord,
                record.id.to_string(),
            ));
        }

        Ok(())
    }

    fn close_loan(&self, id: LoanId, return_date: NaiveDate) -> RepoResult<LoanRecord> {
        let mut record = self
            .get_loan(id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::LoanRecord, id.to_string()))?;
        record.close(return_date)?;

        // The guard keeps a concurrent close from being overwritten.
        let changed = self.conn.execute(
            "UPDATE loan_records
             SET return_date = ?2
             WHERE id = ?1
               AND return_date IS NULL;",
            params![id.to_string(), return_date],
        )?;

        if changed == 0 {
            let returned_on = self
                .get_loan(id)?
                .and_then(|current| current.return_date)
                .ok_or_else(|| RepoError::not_found(EntityKind::LoanRecord, id.to_string()))?;
            return Err(ValidationError::LoanAlreadyClosed { returned_on }.into());
        }

        Ok(record)
    }

    fn get_loan(&self, id: LoanId) -> RepoResult<Option<LoanRecord>> {
        let loan = self
            .conn
            .query_row(
                &format!("{LOAN_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                parse_loan_row,
            )
            .optional()
            .map_err(map_decode_error)?;
        Ok(loan)
    }

    fn list_loans(&self, query: &LoanListQuery) -> RepoResult<Vec<LoanRecord>> {
        let (sql, bind_values) = build_list_sql(LOAN_SELECT_SQL, "", query);
        self.query_loans(&sql, bind_values)
    }

    fn list_overdue_loans(&self, today: NaiveDate) -> RepoResult<Vec<LoanRecord>> {
        // Stored due dates end at 9999-12-31; later days compare against that.
        let (operator, bound) = match last_storable_date() {
            Some(last) if today > last => ("<=", last),
            _ => ("<", today),
        };
        let sql = format!(
            "{LOAN_SELECT_SQL}
             WHERE return_date IS NULL
               AND due_date {operator} ?{LOAN_ORDER_SQL};"
        );
        self.query_loans(&sql, vec![Value::Text(bound.format("%F").to_string())])
    }

    fn list_loan_details(&self, query: &LoanListQuery) -> RepoResult<Vec<LoanDetails>> {
        let (sql, bind_values) = build_list_sql(LOAN_DETAILS_SELECT_SQL, "loan_records.", query);
        let mut stmt = self.conn.prepare(&sql)?;
        let details = stmt
            .query_map(params_from_iter(bind_values), |row| {
                Ok(LoanDetails {
                    record: parse_loan_row(row)?,
                    book_title: row.get("book_title")?,
                    borrower_name: row.get("borrower_name")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_decode_error)?;
        Ok(details)
    }

    fn delete_loan(&self, id: LoanId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM loan_records WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::LoanRecord, id.to_string()));
        }

        Ok(())
    }
}

fn build_list_sql(select_sql: &str, prefix: &str, query: &LoanListQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{select_sql} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(isbn) = &query.book_isbn {
        sql.push_str(&format!(" AND {prefix}book_isbn = ?"));
        bind_values.push(Value::Text(isbn.clone()));
    }

    if let Some(user_id) = &query.borrower_user_id {
        sql.push_str(&format!(" AND {prefix}borrower_user_id = ?"));
        bind_values.push(Value::Text(user_id.clone()));
    }

    if query.open_only {
        sql.push_str(&format!(" AND {prefix}return_date IS NULL"));
    }

    sql.push_str(&format!(" ORDER BY {prefix}loan_date DESC, {prefix}id ASC"));
    query.page.apply(&mut sql, &mut bind_values);
    (sql, bind_values)
}

fn parse_loan_row(row: &Row<'_>) -> rusqlite::Result<LoanRecord> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("invalid uuid value `{id_text}` in loan_records.id").into(),
        )
    })?;

    Ok(LoanRecord {
        id,
        book_isbn: row.get("book_isbn")?,
        borrower_user_id: row.get("borrower_user_id")?,
        loan_date: row.get("loan_date")?,
        due_date: row.get("due_date")?,
        return_date: row.get("return_date")?,
    })
}
