//! Borrower repository contract and SQLite implementation.

use crate::model::borrower::{Borrower, UserType};
use crate::repo::error::{
    map_decode_error, map_delete_error, map_insert_error, EntityKind, ReferenceError, RepoError,
    RepoResult,
};
use crate::repo::{count_loans_by, LoanRefColumn};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const BORROWER_SELECT_SQL: &str = "SELECT user_id, name, user_type FROM borrowers";

/// Repository interface for borrower CRUD.
pub trait BorrowerRepository {
    fn create_borrower(&self, borrower: &Borrower) -> RepoResult<()>;
    fn update_borrower(&self, borrower: &Borrower) -> RepoResult<()>;
    fn get_borrower(&self, user_id: &str) -> RepoResult<Option<Borrower>>;
    /// Lists borrowers ordered by name, then user id. `user_type` filters.
    fn list_borrowers(&self, user_type: Option<UserType>) -> RepoResult<Vec<Borrower>>;
    /// Deletes a borrower with no loan records.
    fn delete_borrower(&self, user_id: &str) -> RepoResult<()>;
}

/// SQLite-backed borrower repository.
pub struct SqliteBorrowerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBorrowerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BorrowerRepository for SqliteBorrowerRepository<'_> {
    fn create_borrower(&self, borrower: &Borrower) -> RepoResult<()> {
        borrower.validate()?;

        self.conn
            .execute(
                "INSERT INTO borrowers (user_id, name, user_type) VALUES (?1, ?2, ?3);",
                params![
                    borrower.user_id.as_str(),
                    borrower.name.as_str(),
                    borrower.user_type.as_str(),
                ],
            )
            .map_err(|err| {
                map_insert_error(err, EntityKind::Borrower, "user_id", &borrower.user_id)
            })?;

        Ok(())
    }

    fn update_borrower(&self, borrower: &Borrower) -> RepoResult<()> {
        borrower.validate()?;

        let changed = self.conn.execute(
            "UPDATE borrowers SET name = ?2, user_type = ?3 WHERE user_id = ?1;",
            params![
                borrower.user_id.as_str(),
                borrower.name.as_str(),
                borrower.user_type.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(
                EntityKind::Borrower,
                borrower.user_id.as_str(),
            ));
        }

        Ok(())
    }

    fn get_borrower(&self, user_id: &str) -> RepoResult<Option<Borrower>> {
        let borrower = self
            .conn
            .query_row(
                &format!("{BORROWER_SELECT_SQL} WHERE user_id = ?1;"),
                [user_id],
                parse_borrower_row,
            )
            .optional()
            .map_err(map_decode_error)?;
        Ok(borrower)
    }

    fn list_borrowers(&self, user_type: Option<UserType>) -> RepoResult<Vec<Borrower>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BORROWER_SELECT_SQL}
             WHERE (?1 IS NULL OR user_type = ?1)
             ORDER BY name ASC, user_id ASC;"
        ))?;
        let borrowers = stmt
            .query_map([user_type.map(UserType::as_str)], parse_borrower_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_decode_error)?;
        Ok(borrowers)
    }

    fn delete_borrower(&self, user_id: &str) -> RepoResult<()> {
        let loans = count_loans_by(self.conn, LoanRefColumn::Borrower, user_id)?;
        if loans > 0 {
            return Err(ReferenceError::Protected {
                entity: EntityKind::Borrower,
                key: user_id.to_string(),
                loans,
            }
            .into());
        }

        let changed = self
            .conn
            .execute("DELETE FROM borrowers WHERE user_id = ?1;", [user_id])
            .map_err(|err| map_delete_error(err, EntityKind::Borrower, user_id))?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Borrower, user_id));
        }

        Ok(())
    }
}

fn parse_borrower_row(row: &Row<'_>) -> rusqlite::Result<Borrower> {
    let type_text: String = row.get("user_type")?;
    let user_type = UserType::parse(&type_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("invalid user type `{type_text}` in borrowers.user_type").into(),
        )
    })?;

    Ok(Borrower {
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        user_type,
    })
}
