//! Librarian repository contract and SQLite implementation.

use crate::model::asset::AssetRef;
use crate::model::librarian::Librarian;
use crate::repo::error::{map_insert_error, EntityKind, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LIBRARIAN_SELECT_SQL: &str = "SELECT employee_id, name, photo, info FROM librarians";

/// Repository interface for librarian CRUD.
pub trait LibrarianRepository {
    fn create_librarian(&self, librarian: &Librarian) -> RepoResult<()>;
    fn update_librarian(&self, librarian: &Librarian) -> RepoResult<()>;
    fn get_librarian(&self, employee_id: &str) -> RepoResult<Option<Librarian>>;
    /// Lists every librarian ordered by name, then employee id.
    fn list_librarians(&self) -> RepoResult<Vec<Librarian>>;
    fn delete_librarian(&self, employee_id: &str) -> RepoResult<()>;
}

/// SQLite-backed librarian repository.
pub struct SqliteLibrarianRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLibrarianRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LibrarianRepository for SqliteLibrarianRepository<'_> {
    fn create_librarian(&self, librarian: &Librarian) -> RepoResult<()> {
        librarian.validate()?;

        self.conn
            .execute(
                "INSERT INTO librarians (employee_id, name, photo, info)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    librarian.employee_id.as_str(),
                    librarian.name.as_str(),
                    librarian.photo.as_ref().map(AssetRef::as_str),
                    librarian.info.as_deref(),
                ],
            )
            .map_err(|err| {
                map_insert_error(
                    err,
                    EntityKind::Librarian,
                    "employee_id",
                    &librarian.employee_id,
                )
            })?;

        Ok(())
    }

    fn update_librarian(&self, librarian: &Librarian) -> RepoResult<()> {
        librarian.validate()?;

        let changed = self.conn.execute(
            "UPDATE librarians
             SET name = ?2, photo = ?3, info = ?4
             WHERE employee_id = ?1;",
            params![
                librarian.employee_id.as_str(),
                librarian.name.as_str(),
                librarian.photo.as_ref().map(AssetRef::as_str),
                librarian.info.as_deref(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(
                EntityKind::Librarian,
                librarian.employee_id.as_str(),
            ));
        }

        Ok(())
    }

    fn get_librarian(&self, employee_id: &str) -> RepoResult<Option<Librarian>> {
        let librarian = self
            .conn
            .query_row(
                &format!("{LIBRARIAN_SELECT_SQL} WHERE employee_id = ?1;"),
                [employee_id],
                parse_librarian_row,
            )
            .optional()?;
        Ok(librarian)
    }

    fn list_librarians(&self) -> RepoResult<Vec<Librarian>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LIBRARIAN_SELECT_SQL} ORDER BY name ASC, employee_id ASC;"))?;
        let librarians = stmt
            .query_map([], parse_librarian_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(librarians)
    }

    fn delete_librarian(&self, employee_id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM librarians WHERE employee_id = ?1;", [employee_id])?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Librarian, employee_id));
        }

        Ok(())
    }
}

fn parse_librarian_row(row: &Row<'_>) -> rusqlite::Result<Librarian> {
    Ok(Librarian {
        employee_id: row.get("employee_id")?,
        name: row.get("name")?,
        photo: row.get::<_, Option<String>>("photo")?.map(AssetRef::new),
        info: row.get("info")?,
    })
}
