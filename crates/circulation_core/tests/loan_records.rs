use circulation_core::db::open_db_in_memory;
use circulation_core::{
    Book, BookRepository, Borrower, BorrowerRepository, EntityKind, LoanListQuery,
    LoanRepository, LoanService, LoanState, NewLoan, ReferenceError, RepoError,
    SqliteBookRepository, SqliteBorrowerRepository, SqliteLoanRepository, UserType,
    ValidationError,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seeded_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let books = SqliteBookRepository::new(&conn);
    let mut jamilia = Book::new("Jamilia", "Chingiz Aitmatov", "isbn-1");
    jamilia.quantity_total = 2;
    books.create_book(&jamilia).unwrap();
    books
        .create_book(&Book::new("The White Ship", "Chingiz Aitmatov", "isbn-2"))
        .unwrap();

    let borrowers = SqliteBorrowerRepository::new(&conn);
    borrowers
        .create_borrower(&Borrower::new("s-1", "Aibek", UserType::Student))
        .unwrap();
    borrowers
        .create_borrower(&Borrower::new("t-1", "Gulnara", UserType::Teacher))
        .unwrap();
    conn
}

fn loan_on(book: &str, borrower: &str, loan_date: NaiveDate) -> NewLoan {
    NewLoan {
        loan_date: Some(loan_date),
        ..NewLoan::new(book, borrower)
    }
}

#[test]
fn missing_due_date_defaults_to_fourteen_days() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let record = repo
        .create_loan(&loan_on("isbn-1", "s-1", date(2024, 1, 1)), date(2024, 3, 1))
        .unwrap();
    assert_eq!(record.loan_date, date(2024, 1, 1));
    assert_eq!(record.due_date, date(2024, 1, 15));

    let loaded = repo.get_loan(record.id).unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn explicit_due_date_is_kept() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let mut loan = loan_on("isbn-1", "s-1", date(2024, 1, 1));
    loan.due_date = Some(date(2024, 1, 3));
    let record = repo.create_loan(&loan, date(2024, 1, 1)).unwrap();
    assert_eq!(record.due_date, date(2024, 1, 3));
}

#[test]
fn loan_date_defaults_to_today() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let record = repo
        .create_loan(&NewLoan::new("isbn-1", "s-1"), date(2024, 5, 10))
        .unwrap();
    assert_eq!(record.loan_date, date(2024, 5, 10));
    assert_eq!(record.due_date, date(2024, 5, 24));
    assert!(!record.id.is_nil());
}

#[test]
fn due_date_is_not_recomputed_on_edit() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let mut record = repo
        .create_loan(&loan_on("isbn-1", "s-1", date(2024, 1, 1)), date(2024, 1, 1))
        .unwrap();
    record.loan_date = date(2024, 2, 1);
    repo.update_loan(&record).unwrap();

    let loaded = repo.get_loan(record.id).unwrap().unwrap();
    assert_eq!(loaded.loan_date, date(2024, 2, 1));
    assert_eq!(loaded.due_date, date(2024, 1, 15));
}

#[test]
fn unknown_references_are_rejected() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let err = repo
        .create_loan(&NewLoan::new("ghost", "s-1"), date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference(ReferenceError::MissingBook(ref isbn)) if isbn == "ghost"
    ));

    let err = repo
        .create_loan(&NewLoan::new("isbn-1", "nobody"), date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference(ReferenceError::MissingBorrower(_))
    ));

    let mut record = repo
        .create_loan(&NewLoan::new("isbn-1", "s-1"), date(2024, 1, 1))
        .unwrap();
    record.book_isbn = "ghost".to_string();
    let err = repo.update_loan(&record).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference(ReferenceError::MissingBook(_))
    ));
}

#[test]
fn overdue_requires_open_loan_strictly_past_due() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let record = repo
        .create_loan(&loan_on("isbn-1", "s-1", date(2024, 1, 1)), date(2024, 1, 1))
        .unwrap();
    assert!(!record.is_overdue_on(date(2024, 1, 14)));
    assert!(!record.is_overdue_on(date(2024, 1, 15)));
    assert!(record.is_overdue_on(date(2024, 1, 16)));

    let closed = repo.close_loan(record.id, date(2024, 2, 1)).unwrap();
    assert_eq!(closed.state(), LoanState::Closed);
    assert!(!closed.is_overdue_on(date(2030, 1, 1)));
}

#[test]
fn close_happens_once() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let record = repo
        .create_loan(&NewLoan::new("isbn-1", "s-1"), date(2024, 1, 1))
        .unwrap();
    assert!(record.is_open());
    repo.close_loan(record.id, date(2024, 1, 10)).unwrap();

    let err = repo.close_loan(record.id, date(2024, 1, 11)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::LoanAlreadyClosed { returned_on })
            if returned_on == date(2024, 1, 10)
    ));

    let mut reopened = repo.get_loan(record.id).unwrap().unwrap();
    reopened.return_date = None;
    let err = repo.update_loan(&reopened).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ReopenLoan)
    ));

    let mut moved = repo.get_loan(record.id).unwrap().unwrap();
    moved.return_date = Some(date(2024, 3, 1));
    let err = repo.update_loan(&moved).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::LoanAlreadyClosed { returned_on })
            if returned_on == date(2024, 1, 10)
    ));
    assert_eq!(
        repo.get_loan(record.id).unwrap().unwrap().return_date,
        Some(date(2024, 1, 10))
    );

    // Edits that keep the return date are still allowed.
    let mut edited = repo.get_loan(record.id).unwrap().unwrap();
    edited.borrower_user_id = "t-1".to_string();
    repo.update_loan(&edited).unwrap();

    let open = repo
        .create_loan(&NewLoan::new("isbn-2", "s-1"), date(2024, 1, 1))
        .unwrap();
    let mut closed_by_edit = open.clone();
    closed_by_edit.return_date = Some(date(2024, 1, 5));
    let err = repo.update_loan(&closed_by_edit).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ReturnOutsideClose)
    ));
    assert!(repo.get_loan(open.id).unwrap().unwrap().is_open());

    let err = repo.close_loan(Uuid::new_v4(), date(2024, 1, 11)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::LoanRecord,
            ..
        }
    ));
}

#[test]
fn loans_do_not_touch_book_availability() {
    let conn = seeded_db();
    let loans = SqliteLoanRepository::new(&conn);
    let books = SqliteBookRepository::new(&conn);

    let record = loans
        .create_loan(&NewLoan::new("isbn-1", "s-1"), date(2024, 1, 1))
        .unwrap();
    assert_eq!(books.get_book("isbn-1").unwrap().unwrap().quantity_available, 2);

    loans.close_loan(record.id, date(2024, 1, 5)).unwrap();
    let book = books.get_book("isbn-1").unwrap().unwrap();
    assert_eq!(book.quantity_available, 2);
    assert_eq!(book.loan_count, 0);
}

#[test]
fn listing_is_newest_loan_first_with_filters() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let oldest = repo
        .create_loan(&loan_on("isbn-1", "s-1", date(2024, 1, 1)), date(2024, 1, 1))
        .unwrap();
    let newest = repo
        .create_loan(&loan_on("isbn-2", "t-1", date(2024, 3, 1)), date(2024, 3, 1))
        .unwrap();
    let middle = repo
        .create_loan(&loan_on("isbn-1", "t-1", date(2024, 2, 1)), date(2024, 2, 1))
        .unwrap();
    repo.close_loan(oldest.id, date(2024, 1, 10)).unwrap();

    let ids: Vec<_> = repo
        .list_loans(&LoanListQuery::default())
        .unwrap()
        .into_iter()
        .map(|loan| loan.id)
        .collect();
    assert_eq!(ids, [newest.id, middle.id, oldest.id]);

    let open_for_book = repo
        .list_loans(&LoanListQuery {
            book_isbn: Some("isbn-1".to_string()),
            open_only: true,
            ..LoanListQuery::default()
        })
        .unwrap();
    assert_eq!(open_for_book.len(), 1);
    assert_eq!(open_for_book[0].id, middle.id);

    let for_teacher = repo
        .list_loans(&LoanListQuery {
            borrower_user_id: Some("t-1".to_string()),
            ..LoanListQuery::default()
        })
        .unwrap();
    assert_eq!(for_teacher.len(), 2);
}

#[test]
fn overdue_listing_skips_returned_and_current_loans() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let late = repo
        .create_loan(&loan_on("isbn-1", "s-1", date(2024, 1, 1)), date(2024, 1, 1))
        .unwrap();
    let returned = repo
        .create_loan(&loan_on("isbn-2", "s-1", date(2024, 1, 1)), date(2024, 1, 1))
        .unwrap();
    repo.create_loan(&loan_on("isbn-1", "t-1", date(2024, 1, 20)), date(2024, 1, 20))
        .unwrap();
    repo.close_loan(returned.id, date(2024, 1, 30)).unwrap();

    let overdue = repo.list_overdue_loans(date(2024, 2, 1)).unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, late.id);

    // Due on 2024-01-15: not yet overdue on the due date itself.
    assert!(repo.list_overdue_loans(date(2024, 1, 15)).unwrap().is_empty());
}

#[test]
fn overdue_listing_agrees_with_record_at_calendar_edges() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);

    let err = repo
        .create_loan(&loan_on("isbn-1", "s-1", date(9999, 12, 30)), date(2024, 6, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DateOutOfRange { field: "due_date", .. })
    ));
    assert!(repo.list_overdue_loans(date(2024, 6, 1)).unwrap().is_empty());

    let mut last_day = loan_on("isbn-1", "s-1", date(9999, 12, 1));
    last_day.due_date = Some(date(9999, 12, 31));
    let record = repo.create_loan(&last_day, date(2024, 6, 1)).unwrap();
    assert!(repo.list_overdue_loans(date(2024, 6, 1)).unwrap().is_empty());
    assert!(repo.list_overdue_loans(date(9999, 12, 31)).unwrap().is_empty());

    let after = date(10000, 1, 1);
    assert!(record.is_overdue_on(after));
    let overdue = repo.list_overdue_loans(after).unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, record.id);

    let mut pushed = record.clone();
    pushed.due_date = date(10000, 1, 13);
    let err = repo.update_loan(&pushed).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DateOutOfRange { .. })
    ));
}

#[test]
fn details_join_titles_and_names() {
    let conn = seeded_db();
    let repo = SqliteLoanRepository::new(&conn);
    repo.create_loan(&loan_on("isbn-2", "t-1", date(2024, 1, 1)), date(2024, 1, 1))
        .unwrap();

    let details = repo.list_loan_details(&LoanListQuery::default()).unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].book_title, "The White Ship");
    assert_eq!(details[0].borrower_name, "Gulnara");
    assert_eq!(details[0].to_string(), "'The White Ship' lent to Gulnara");
}

#[test]
fn deleting_last_loan_unprotects_borrower() {
    let conn = seeded_db();
    let loans = SqliteLoanRepository::new(&conn);
    let borrowers = SqliteBorrowerRepository::new(&conn);

    let record = loans
        .create_loan(&NewLoan::new("isbn-1", "s-1"), date(2024, 1, 1))
        .unwrap();
    assert!(borrowers.delete_borrower("s-1").is_err());

    loans.delete_loan(record.id).unwrap();
    assert!(loans.get_loan(record.id).unwrap().is_none());
    borrowers.delete_borrower("s-1").unwrap();
}

#[test]
fn service_opens_and_closes_loans() {
    let conn = seeded_db();
    let service = LoanService::new(SqliteLoanRepository::new(&conn));

    let record = service
        .open_loan_on(&NewLoan::new("isbn-1", "s-1"), date(2024, 1, 1))
        .unwrap();
    assert_eq!(
        service.list_overdue_on(date(2024, 1, 16)).unwrap().len(),
        1
    );

    let closed = service.close_loan(record.id, date(2024, 1, 16)).unwrap();
    assert_eq!(closed.return_date, Some(date(2024, 1, 16)));
    assert!(service.list_overdue_on(date(2024, 1, 17)).unwrap().is_empty());

    let err = service
        .open_loan_on(&NewLoan::new("ghost", "s-1"), date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(err, RepoError::Reference(_)));
}
