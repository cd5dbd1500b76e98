//! Loan record domain model.
//!
//! # Responsibility
//! - Define the join record between one book and one borrower.
//! - Resolve loan/due date defaults at write time.
//! - Derive open/closed/overdue state from dates alone.
//!
//! # Invariants
//! - `id` is generated once and never reused for another loan.
//! - The due date default (`loan_date + 14 days`) is applied only when the
//!   due date is missing; an existing due date is never recomputed.
//! - A loan moves from open to closed exactly once and never back.
//! - Stored dates stay inside years 0000-9999 so their ISO text sorts in
//!   calendar order.
//! - Nothing here touches the referenced book's copy counts.

use crate::model::ValidationError;
use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a loan record.
pub type LoanId = Uuid;

/// Length of a loan when no due date is given.
pub const DEFAULT_LOAN_PERIOD_DAYS: u64 = 14;

/// Current local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Returns `loan_date + DEFAULT_LOAN_PERIOD_DAYS`.
pub fn default_due_date(loan_date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    loan_date
        .checked_add_days(Days::new(DEFAULT_LOAN_PERIOD_DAYS))
        .ok_or(ValidationError::DueDateOutOfRange { loan_date })
}

const MAX_STORED_YEAR: i32 = 9999;

/// Latest date a loan column may hold.
pub(crate) fn last_storable_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(MAX_STORED_YEAR, 12, 31)
}

fn check_storable_date(field: &'static str, date: NaiveDate) -> Result<(), ValidationError> {
    if (0..=MAX_STORED_YEAR).contains(&date.year()) {
        Ok(())
    } else {
        Err(ValidationError::DateOutOfRange { field, date })
    }
}

/// Observable loan state. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    /// No return recorded yet.
    Open,
    /// Return date set.
    Closed,
}

/// Input for opening a loan. Missing dates are filled in on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_isbn: String,
    pub borrower_user_id: String,
    /// Defaults to the current date.
    pub loan_date: Option<NaiveDate>,
    /// Defaults to `loan_date + 14 days`.
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

impl NewLoan {
    pub fn new(book_isbn: impl Into<String>, borrower_user_id: impl Into<String>) -> Self {
        Self {
            book_isbn: book_isbn.into(),
            borrower_user_id: borrower_user_id.into(),
            loan_date: None,
            due_date: None,
            return_date: None,
        }
    }

    /// Resolves date defaults against `today` and assigns a fresh id.
    pub fn into_record(self, today: NaiveDate) -> Result<LoanRecord, ValidationError> {
        let loan_date = self.loan_date.unwrap_or(today);
        let due_date = match self.due_date {
            Some(due_date) => due_date,
            None => default_due_date(loan_date)?,
        };

        let record = LoanRecord {
            id: Uuid::new_v4(),
            book_isbn: self.book_isbn,
            borrower_user_id: self.borrower_user_id,
            loan_date,
            due_date,
            return_date: self.return_date,
        };
        record.validate_dates()?;
        Ok(record)
    }
}

/// Persisted loan transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub book_isbn: String,
    pub borrower_user_id: String,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    /// `None` while the book is still out.
    pub return_date: Option<NaiveDate>,
}

impl LoanRecord {
    pub fn state(&self) -> LoanState {
        match self.return_date {
            Some(_) => LoanState::Closed,
            None => LoanState::Open,
        }
    }

    /// Rejects dates whose ISO text would not sort chronologically.
    pub fn validate_dates(&self) -> Result<(), ValidationError> {
        check_storable_date("loan_date", self.loan_date)?;
        check_storable_date("due_date", self.due_date)?;
        if let Some(return_date) = self.return_date {
            check_storable_date("return_date", return_date)?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// True when the loan is open and `today` is strictly after the due date.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.is_open() && today > self.due_date
    }

    /// `is_overdue_on` against the current local date.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(today())
    }

    /// Records the return. Fails when the loan is already closed.
    pub fn close(&mut self, return_date: NaiveDate) -> Result<(), ValidationError> {
        if let Some(returned_on) = self.return_date {
            return Err(ValidationError::LoanAlreadyClosed { returned_on });
        }
        check_storable_date("return_date", return_date)?;
        self.return_date = Some(return_date);
        Ok(())
    }
}
