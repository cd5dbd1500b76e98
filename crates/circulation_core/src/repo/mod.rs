//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define one data-access contract per circulation record.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Write paths validate (and normalize, for books) before SQL mutations.
//! - Constraint failures surface as semantic errors (`UniquenessViolation`,
//!   `Reference`), never as raw SQLite errors.
//! - Deletes of referenced books or borrowers are refused, never cascaded.

pub mod book_repo;
pub mod borrower_repo;
pub mod error;
pub mod librarian_repo;
pub mod loan_repo;

use crate::repo::error::RepoResult;
use rusqlite::{params, Connection};

/// Query window shared by list APIs. `limit = None` returns every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    /// Appends `LIMIT/OFFSET` placeholders and their values.
    pub(crate) fn apply(&self, sql: &mut String, bind_values: &mut Vec<rusqlite::types::Value>) {
        use rusqlite::types::Value;

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Number of loan records pointing at `key` through `column`.
pub(crate) fn count_loans_by(
    conn: &Connection,
    column: LoanRefColumn,
    key: &str,
) -> RepoResult<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM loan_records WHERE {} = ?1;",
        column.as_sql()
    );
    let count: i64 = conn.query_row(&sql, params![key], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LoanRefColumn {
    Book,
    Borrower,
}

impl LoanRefColumn {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Book => "book_isbn",
            Self::Borrower => "borrower_user_id",
        }
    }
}
