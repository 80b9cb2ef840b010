//! The balance model and the endpoint that serves it.

mod balance_endpoint;
mod core;

pub use balance_endpoint::{BalanceState, get_balance_endpoint};
pub use core::Balance;
