use serde::{Deserialize, Serialize};

/// The running total of every transaction in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// The sum of the amounts of all recorded transactions.
    pub balance: f64,
}

impl Balance {
    /// Create a balance with the value `balance`.
    pub fn new(balance: f64) -> Self {
        Self { balance }
    }
}
