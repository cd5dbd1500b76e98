//! Repository error types shared by every circulation repository.

use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Record type named in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Librarian,
    Book,
    Borrower,
    LoanRecord,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Librarian => "librarian",
            Self::Book => "book",
            Self::Borrower => "borrower",
            Self::LoanRecord => "loan record",
        })
    }
}

/// Referential-integrity failure between loans and their targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A loan points at an isbn with no book.
    MissingBook(String),
    /// A loan points at a user id with no borrower.
    MissingBorrower(String),
    /// Delete refused while loan records still reference the target.
    Protected {
        entity: EntityKind,
        key: String,
        loans: u64,
    },
}

impl Display for ReferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBook(isbn) => write!(f, "referenced book does not exist: {isbn}"),
            Self::MissingBorrower(user_id) => {
                write!(f, "referenced borrower does not exist: {user_id}")
            }
            Self::Protected { entity, key, loans } => write!(
                f,
                "cannot delete {entity} `{key}`: referenced by {loans} loan record(s)"
            ),
        }
    }
}

impl Error for ReferenceError {}

/// Error returned by repository reads and writes.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        entity: EntityKind,
        key: String,
    },
    /// Write would duplicate a unique key.
    UniquenessViolation {
        entity: EntityKind,
        field: &'static str,
        value: String,
    },
    Reference(ReferenceError),
    /// Stored row could not be decoded into a domain record.
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::UniquenessViolation {
                entity,
                field,
                value,
            } => write!(f, "{entity} with {field} `{value}` already exists"),
            Self::Reference(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Reference(err) => Some(err),
            Self::NotFound { .. } | Self::UniquenessViolation { .. } | Self::InvalidData(_) => {
                None
            }
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ReferenceError> for RepoError {
    fn from(value: ReferenceError) -> Self {
        Self::Reference(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// SQLite constraint family behind a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    Unique,
    ForeignKey,
}

pub(crate) fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => match inner.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                Some(ConstraintKind::Unique)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintKind::ForeignKey),
            _ => None,
        },
        _ => None,
    }
}

/// Maps a failed insert of a keyed record to `UniquenessViolation`.
pub(crate) fn map_insert_error(
    err: rusqlite::Error,
    entity: EntityKind,
    field: &'static str,
    value: &str,
) -> RepoError {
    match constraint_kind(&err) {
        Some(ConstraintKind::Unique) => RepoError::UniquenessViolation {
            entity,
            field,
            value: value.to_string(),
        },
        _ => err.into(),
    }
}

/// Maps a foreign-key failure on delete to `ReferenceError::Protected`.
///
/// The exact loan count is unknown at this point, so `loans` reports the
/// minimum that can have caused the failure.
pub(crate) fn map_delete_error(err: rusqlite::Error, entity: EntityKind, key: &str) -> RepoError {
    match constraint_kind(&err) {
        Some(ConstraintKind::ForeignKey) => RepoError::Reference(ReferenceError::Protected {
            entity,
            key: key.to_string(),
            loans: 1,
        }),
        _ => err.into(),
    }
}

/// Maps row decoding failures to `InvalidData`; other errors pass through.
pub(crate) fn map_decode_error(err: rusqlite::Error) -> RepoError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
            RepoError::InvalidData(source.to_string())
        }
        other => other.into(),
    }
}
