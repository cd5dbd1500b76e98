//! Circulation domain model.
//!
//! # Responsibility
//! - Define the four circulation records: librarians, books, borrowers and
//!   loan records.
//! - Own write-time normalization (availability clamping, due-date default)
//!   and field validation shared by every write path.
//!
//! # Invariants
//! - Natural keys (`employee_id`, `isbn`, `user_id`) are never blank.
//! - A book's available count is inside `[0, quantity_total]` once normalized.
//! - Loan ids are generated once and never reused.

pub mod asset;
pub mod book;
pub mod borrower;
pub mod librarian;
pub mod loan;

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Write-time rule violation raised before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty or whitespace-only.
    EmptyField { field: &'static str },
    /// Text field exceeds its column limit (in characters).
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    /// `loan_date + 14 days` falls outside the supported calendar.
    DueDateOutOfRange { loan_date: NaiveDate },
    /// The loan already carries a return date.
    LoanAlreadyClosed { returned_on: NaiveDate },
    /// A closed loan cannot lose its return date.
    ReopenLoan,
    /// Return dates are only written by closing the loan.
    ReturnOutsideClose,
    /// Date cannot be stored as a four-digit ISO year.
    DateOutOfRange {
        field: &'static str,
        date: NaiveDate,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { field } => write!(f, "{field} cannot be empty"),
            Self::TooLong { field, max, actual } => {
                write!(f, "{field} is {actual} characters long; limit is {max}")
            }
            Self::DueDateOutOfRange { loan_date } => {
                write!(f, "default due date for loan date {loan_date} is out of range")
            }
            Self::LoanAlreadyClosed { returned_on } => {
                write!(f, "loan was already returned on {returned_on}")
            }
            Self::ReopenLoan => write!(f, "a returned loan cannot be reopened"),
            Self::ReturnOutsideClose => {
                write!(f, "return date can only be set by closing the loan")
            }
            Self::DateOutOfRange { field, date } => {
                write!(f, "{field} {date} is outside years 0000-9999")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks a required text field against blank input and its length limit.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    check_length(field, value, max)
}

/// Checks an optional text field against its length limit.
pub(crate) fn check_optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => check_length(field, value, max),
        None => Ok(()),
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}
