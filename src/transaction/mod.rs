//! Transactions and the endpoint for recording them.
//!
//! This module contains:
//! - The `Transaction` model and its validation rules
//! - The shared helper that appends batches to the ledger and logs the outcome
//! - The route handler for recording a transaction

mod append;
mod core;
mod create_endpoint;

pub use append::append_transactions;
pub use core::{Transaction, now_utc_seconds, truncate_to_seconds};
pub use create_endpoint::{
    CreateTransactionState, TransactionRequest, create_transaction_endpoint,
};
