//! Defines the endpoint for reading the current balance.
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State},
};

use crate::{AppState, balance::Balance, ledger::Ledger};

/// The state needed to read the balance.
#[derive(Debug, Clone)]
pub struct BalanceState {
    /// The ledger that holds the cached balance.
    pub ledger: Arc<Ledger>,
}

impl FromRef<AppState> for BalanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
        }
    }
}

/// A route handler that returns the current balance as JSON.
pub async fn get_balance_endpoint(State(state): State<BalanceState>) -> Json<Balance> {
    Json(state.ledger.current_balance())
}
