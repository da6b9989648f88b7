use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::macros::date;

use dinero_rs::{
    account::{AccountForm, AccountType, create_account},
    category::{CategoryForm, CategoryType, create_category},
    credit::{CreditForm, PaymentFrequency, create_credit},
    initialize_db,
    transaction::{
        NewTransaction, PaymentMethod, TransactionStatus, TransactionType, append_transaction,
    },
};

/// A utility for creating a demo database for the REST API server of dinero-rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo accounts and categories...");

    let cash = create_account(
        &AccountForm {
            name: "Cash".to_owned(),
            kind: AccountType::Cash,
            initial_balance: Some(5_000.0),
            notes: "Personal wallet".to_owned(),
        },
        &conn,
    )?;
    let payroll = create_account(
        &AccountForm {
            name: "Payroll account".to_owned(),
            kind: AccountType::Bank,
            initial_balance: Some(25_000.0),
            notes: "Main account".to_owned(),
        },
        &conn,
    )?;
    create_account(
        &AccountForm {
            name: "Gold card".to_owned(),
            kind: AccountType::Card,
            initial_balance: Some(0.0),
            notes: "Available credit: $30,000".to_owned(),
        },
        &conn,
    )?;

    let salary = create_category(
        &CategoryForm {
            name: "Salary".to_owned(),
            kind: CategoryType::Income,
            icon: "Wallet".to_owned(),
            color: "#10b981".to_owned(),
        },
        &conn,
    )?;
    let groceries = create_category(
        &CategoryForm {
            name: "Groceries".to_owned(),
            kind: CategoryType::Expense,
            icon: "ShoppingCart".to_owned(),
            color: "#f59e0b".to_owned(),
        },
        &conn,
    )?;
    create_category(
        &CategoryForm {
            name: "Transport".to_owned(),
            kind: CategoryType::Expense,
            icon: "Car".to_owned(),
            color: "#ef4444".to_owned(),
        },
        &conn,
    )?;

    println!("Creating demo transactions...");

    append_transaction(
        NewTransaction {
            date: date!(2024 - 06 - 01),
            kind: TransactionType::Income,
            amount: 35_000.0,
            currency: "MXN".to_owned(),
            category_id: salary.id,
            account_id: payroll.id,
            description: "Monthly salary".to_owned(),
            method: PaymentMethod::Transfer,
            status: TransactionStatus::Confirmed,
            tags: vec!["fixed".to_owned()],
            source_payment_id: None,
        },
        &conn,
    )?;
    append_transaction(
        NewTransaction {
            date: date!(2024 - 06 - 03),
            kind: TransactionType::Expense,
            amount: 1_250.0,
            currency: "MXN".to_owned(),
            category_id: groceries.id,
            account_id: cash.id,
            description: "Weekly groceries".to_owned(),
            method: PaymentMethod::Cash,
            status: TransactionStatus::Confirmed,
            tags: Vec::new(),
            source_payment_id: None,
        },
        &conn,
    )?;

    println!("Creating demo credit with its payment schedule...");

    create_credit(
        &CreditForm {
            name: "Car loan".to_owned(),
            total_amount: 180_000.0,
            remaining_amount: Some(95_000.0),
            interest_rate: 12.5,
            monthly_payment: 4_850.0,
            start_date: date!(2023 - 03 - 15),
            end_date: date!(2026 - 03 - 15),
            next_payment_date: Some(date!(2024 - 07 - 15)),
            frequency: PaymentFrequency::Monthly,
            notes: "36 month term".to_owned(),
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
