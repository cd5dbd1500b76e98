//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `circulation_core` linkage without any UI.
//! - With `--log-dir <dir>`, route core log events to rolling files there.
//! - With a database path argument, open (and migrate) it and print a
//!   circulation summary.

use circulation_core::db::open_db;
use circulation_core::{
    default_log_level, init_logging, BookListQuery, BookRepository, BorrowerRepository,
    LoanListQuery, LoanService, SqliteBookRepository, SqliteBorrowerRepository,
    SqliteLoanRepository,
};
use std::error::Error;
use std::process::ExitCode;

const USAGE: &str = "usage: circulation_cli [--log-dir <dir>] [<db-path>]";

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    log_dir: Option<String>,
    db_path: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--log-dir" {
            let dir = args.next().ok_or("--log-dir needs a directory")?;
            parsed.log_dir = Some(dir);
        } else if arg.starts_with("--") {
            return Err(format!("unknown option {arg}"));
        } else if parsed.db_path.is_none() {
            parsed.db_path = Some(arg);
        } else {
            return Err(format!("unexpected argument {arg}"));
        }
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Some(log_dir) = &args.log_dir {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("error: logging disabled: {err}");
            return ExitCode::FAILURE;
        }
    }

    println!("circulation_core ping={}", circulation_core::ping());
    println!("circulation_core version={}", circulation_core::core_version());

    let Some(db_path) = args.db_path else {
        return ExitCode::SUCCESS;
    };

    match print_summary(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(db_path: &str) -> Result<(), Box<dyn Error>> {
    let conn = open_db(db_path)?;
    let books = SqliteBookRepository::new(&conn).list_books(&BookListQuery::default())?;
    let borrowers = SqliteBorrowerRepository::new(&conn).list_borrowers(None)?;
    let loans = LoanService::new(SqliteLoanRepository::new(&conn));

    let open = loans.list_loans(&LoanListQuery {
        open_only: true,
        ..LoanListQuery::default()
    })?;
    let overdue = loans.list_overdue()?;

    println!("books={} borrowers={}", books.len(), borrowers.len());
    println!("open_loans={} overdue_loans={}", open.len(), overdue.len());
    for loan in overdue {
        println!(
            "overdue loan_id={} book_isbn={} borrower={} due_date={}",
            loan.id, loan.book_isbn, loan.borrower_user_id, loan.due_date
        );
    }
    Ok(())
}
