use circulation_core::db::open_db_in_memory;
use circulation_core::{
    AssetRef, Book, BookRepository, Borrower, BorrowerRepository, EntityKind, Librarian,
    LibrarianRepository, LoanRepository, NewLoan, ReferenceError, RepoError,
    SqliteBookRepository, SqliteBorrowerRepository, SqliteLibrarianRepository,
    SqliteLoanRepository, UserType, ValidationError, LIBRARIAN_PHOTO_DIR,
};
use chrono::NaiveDate;

#[test]
fn librarian_crud_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLibrarianRepository::new(&conn);

    let mut librarian = Librarian::new("Nurila", "E-001");
    librarian.photo = Some(AssetRef::upload(LIBRARIAN_PHOTO_DIR, "nurila.png"));
    repo.create_librarian(&librarian).unwrap();

    let loaded = repo.get_librarian("E-001").unwrap().unwrap();
    assert_eq!(loaded, librarian);
    assert_eq!(loaded.to_string(), "Nurila");

    librarian.info = Some("Evening shift".to_string());
    librarian.photo = None;
    repo.update_librarian(&librarian).unwrap();
    let loaded = repo.get_librarian("E-001").unwrap().unwrap();
    assert_eq!(loaded.info.as_deref(), Some("Evening shift"));
    assert_eq!(loaded.photo, None);

    repo.delete_librarian("E-001").unwrap();
    assert!(repo.get_librarian("E-001").unwrap().is_none());
    let err = repo.delete_librarian("E-001").unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Librarian,
            ..
        }
    ));
}

#[test]
fn duplicate_employee_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLibrarianRepository::new(&conn);
    repo.create_librarian(&Librarian::new("Nurila", "E-001"))
        .unwrap();

    let err = repo
        .create_librarian(&Librarian::new("Bakyt", "E-001"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniquenessViolation {
            entity: EntityKind::Librarian,
            field: "employee_id",
            ..
        }
    ));
}

#[test]
fn librarians_list_by_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLibrarianRepository::new(&conn);
    repo.create_librarian(&Librarian::new("Nurila", "E-001"))
        .unwrap();
    repo.create_librarian(&Librarian::new("Bakyt", "E-002"))
        .unwrap();

    let names: Vec<_> = repo
        .list_librarians()
        .unwrap()
        .into_iter()
        .map(|librarian| librarian.name)
        .collect();
    assert_eq!(names, ["Bakyt", "Nurila"]);
}

#[test]
fn librarian_requires_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLibrarianRepository::new(&conn);

    let err = repo
        .create_librarian(&Librarian::new("", "E-003"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyField { field: "name" })
    ));
}

#[test]
fn borrower_crud_and_type_filter() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBorrowerRepository::new(&conn);

    repo.create_borrower(&Borrower::new("s-1", "Aibek", UserType::Student))
        .unwrap();
    repo.create_borrower(&Borrower::new("t-1", "Gulnara", UserType::Teacher))
        .unwrap();

    let mut aibek = repo.get_borrower("s-1").unwrap().unwrap();
    assert_eq!(aibek.to_string(), "Aibek (Student)");

    aibek.user_type = UserType::Teacher;
    repo.update_borrower(&aibek).unwrap();

    let teachers = repo.list_borrowers(Some(UserType::Teacher)).unwrap();
    assert_eq!(teachers.len(), 2);
    assert!(repo.list_borrowers(Some(UserType::Student)).unwrap().is_empty());
    assert_eq!(repo.list_borrowers(None).unwrap()[0].name, "Aibek");

    let err = repo
        .update_borrower(&Borrower::new("nobody", "Ghost", UserType::Student))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn duplicate_user_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBorrowerRepository::new(&conn);
    repo.create_borrower(&Borrower::new("s-1", "Aibek", UserType::Student))
        .unwrap();

    let err = repo
        .create_borrower(&Borrower::new("s-1", "Other", UserType::Teacher))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniquenessViolation {
            entity: EntityKind::Borrower,
            field: "user_id",
            ..
        }
    ));
}

#[test]
fn borrower_with_loans_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let borrowers = SqliteBorrowerRepository::new(&conn);
    SqliteBookRepository::new(&conn)
        .create_book(&Book::new("Jamilia", "Chingiz Aitmatov", "isbn-1"))
        .unwrap();
    borrowers
        .create_borrower(&Borrower::new("s-1", "Aibek", UserType::Student))
        .unwrap();
    let loans = SqliteLoanRepository::new(&conn);
    loans
        .create_loan(
            &NewLoan::new("isbn-1", "s-1"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();
    loans
        .create_loan(
            &NewLoan::new("isbn-1", "s-1"),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .unwrap();

    let err = borrowers.delete_borrower("s-1").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference(ReferenceError::Protected {
            entity: EntityKind::Borrower,
            loans: 2,
            ..
        })
    ));
    assert!(err.to_string().contains("referenced by 2 loan record(s)"));
}

#[test]
fn corrupt_user_type_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    // Bypass the CHECK constraint to simulate a row written by older tooling.
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON;
         INSERT INTO borrowers (user_id, name, user_type) VALUES ('x-1', 'Odd', 'staff');
         PRAGMA ignore_check_constraints = OFF;",
    )
    .unwrap();

    let err = SqliteBorrowerRepository::new(&conn)
        .get_borrower("x-1")
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(ref message) if message.contains("staff")));
}
