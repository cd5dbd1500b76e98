//! Lending use-case service.
//!
//! # Responsibility
//! - Open and close loans on top of `LoanRepository`.
//! - Provide overdue listings against a caller-chosen or local "today".
//!
//! # Invariants
//! - Opening or closing a loan never changes book availability. Inventory
//!   adjustment is an external responsibility.

use crate::model::loan::{today, LoanId, LoanRecord, NewLoan};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::loan_repo::{LoanDetails, LoanListQuery, LoanRepository};
use chrono::NaiveDate;
use log::{error, info, warn};

/// Use-case service wrapper for loan operations.
pub struct LoanService<R: LoanRepository> {
    repo: R,
}

impl<R: LoanRepository> LoanService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Opens a loan, defaulting missing dates against the local date.
    pub fn open_loan(&self, loan: &NewLoan) -> RepoResult<LoanRecord> {
        self.open_loan_on(loan, today())
    }

    /// Opens a loan, defaulting missing dates against `today`.
    ///
    /// # Contract
    /// - `loan_date` falls back to `today`.
    /// - `due_date` falls back to `loan_date + 14 days`.
    /// - Fails with a reference error when the book or borrower is unknown.
    pub fn open_loan_on(&self, loan: &NewLoan, today: NaiveDate) -> RepoResult<LoanRecord> {
        match self.repo.create_loan(loan, today) {
            Ok(record) => {
                info!(
                    "event=loan_open module=loan status=ok loan_id={} book_isbn={} borrower={} due_date={}",
                    record.id, record.book_isbn, record.borrower_user_id, record.due_date
                );
                Ok(record)
            }
            Err(err) => {
                log_write_error("loan_open", None, &err);
                Err(err)
            }
        }
    }

    /// Records the return of an open loan.
    pub fn close_loan(&self, id: LoanId, return_date: NaiveDate) -> RepoResult<LoanRecord> {
        match self.repo.close_loan(id, return_date) {
            Ok(record) => {
                info!(
                    "event=loan_close module=loan status=ok loan_id={id} return_date={return_date}"
                );
                Ok(record)
            }
            Err(err) => {
                log_write_error("loan_close", Some(id), &err);
                Err(err)
            }
        }
    }

    /// Saves edits to an existing loan. Reference checks apply.
    pub fn update_loan(&self, record: &LoanRecord) -> RepoResult<()> {
        self.repo
            .update_loan(record)
            .inspect_err(|err| log_write_error("loan_update", Some(record.id), err))
    }

    pub fn get_loan(&self, id: LoanId) -> RepoResult<Option<LoanRecord>> {
        self.repo.get_loan(id)
    }

    /// Lists loans, most recent loan date first.
    pub fn list_loans(&self, query: &LoanListQuery) -> RepoResult<Vec<LoanRecord>> {
        self.repo.list_loans(query)
    }

    pub fn list_loan_details(&self, query: &LoanListQuery) -> RepoResult<Vec<LoanDetails>> {
        self.repo.list_loan_details(query)
    }

    /// Overdue loans as of the local date.
    pub fn list_overdue(&self) -> RepoResult<Vec<LoanRecord>> {
        self.list_overdue_on(today())
    }

    pub fn list_overdue_on(&self, today: NaiveDate) -> RepoResult<Vec<LoanRecord>> {
        self.repo.list_overdue_loans(today)
    }

    pub fn delete_loan(&self, id: LoanId) -> RepoResult<()> {
        self.repo.delete_loan(id)?;
        info!("event=loan_delete module=loan status=ok loan_id={id}");
        Ok(())
    }
}

fn log_write_error(event: &str, id: Option<LoanId>, err: &RepoError) {
    let loan_id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
    match err {
        RepoError::Db(_) | RepoError::InvalidData(_) => error!(
            "event={event} module=loan status=error loan_id={loan_id} error_code=storage_failed error={err}"
        ),
        _ => warn!("event={event} module=loan status=rejected loan_id={loan_id} error={err}"),
    }
}
