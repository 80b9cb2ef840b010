//! Print every transaction in a ledger file followed by the balance it adds up to.
//!
//! The file is only read, so this is safe to run against the ledger of a live server.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use tally_rs::read_log;

/// Print the transactions in a tally_rs ledger and the resulting balance.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the transaction ledger.
    #[arg(env = "TALLY_DB", default_value = "./transactions.csv")]
    db: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let transactions = match read_log(&args.db) {
        Ok(transactions) => transactions,
        Err(error) => {
            eprintln!("Could not read {}: {error}", args.db.display());
            return ExitCode::FAILURE;
        }
    };

    let mut balance = 0.0;
    for transaction in &transactions {
        balance += transaction.amount;
        println!("{transaction}");
    }

    println!("{} transactions, balance {balance}", transactions.len());

    ExitCode::SUCCESS
}
