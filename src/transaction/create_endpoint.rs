//! Defines the endpoint for recording a new transaction.
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    ledger::Ledger,
    transaction::{Transaction, append_transactions, now_utc_seconds},
};

/// The state needed to record a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The ledger to append transactions to.
    pub ledger: Arc<Ledger>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
        }
    }
}

/// The JSON body for recording a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    /// The amount of money received (positive) or spent (negative).
    pub amount: f64,
    /// When the transaction happened, defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    /// Text detailing the transaction.
    pub comment: String,
}

/// A route handler for recording a new transaction, responds with
/// `201 Created` once the transaction is in the ledger.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("rejected transaction: {rejection}");
            return Error::InvalidRequest(rejection.body_text()).into_response();
        }
    };

    let date = request.date.unwrap_or_else(now_utc_seconds);

    let transaction = match Transaction::validated(request.amount, date, &request.comment) {
        Ok(transaction) => transaction,
        Err(error) => {
            tracing::warn!("rejected transaction: {error}");
            return error.into_response();
        }
    };

    match append_transactions(&state.ledger, &[transaction]) {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use axum::{
        Json,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
    };
    use tempfile::TempDir;
    use time::macros::datetime;

    use crate::{
        ledger::{Ledger, read_log},
        transaction::{
            CreateTransactionState, Transaction, TransactionRequest, create_transaction_endpoint,
        },
    };

    fn get_test_state() -> (TempDir, CreateTransactionState) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("transactions.csv")).unwrap();

        (
            dir,
            CreateTransactionState {
                ledger: Arc::new(ledger),
            },
        )
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let (_dir, state) = get_test_state();
        let request = TransactionRequest {
            amount: 12.3,
            date: Some(datetime!(2024-03-01 10:00:00 +01:00)),
            comment: "  test transaction ".to_owned(),
        };

        let response = create_transaction_endpoint(State(state.clone()), Ok(Json(request)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.ledger.current_balance().balance, 12.3);
        assert_eq!(
            read_log(state.ledger.path()).unwrap(),
            vec![Transaction::new(
                12.3,
                datetime!(2024-03-01 10:00:00 +01:00),
                "test transaction"
            )]
        );
    }

    #[tokio::test]
    async fn missing_date_defaults_to_now() {
        let (_dir, state) = get_test_state();
        let before = time::OffsetDateTime::now_utc() - time::Duration::seconds(1);
        let request = TransactionRequest {
            amount: -4.0,
            date: None,
            comment: "stamps".to_owned(),
        };

        let response = create_transaction_endpoint(State(state.clone()), Ok(Json(request)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let transactions = read_log(state.ledger.path()).unwrap();
        assert_eq!(transactions.len(), 1);
        assert!(transactions[0].date >= before, "got {}", transactions[0].date);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let (_dir, state) = get_test_state();
        let request = TransactionRequest {
            amount: 0.0,
            date: None,
            comment: "nothing".to_owned(),
        };

        let response = create_transaction_endpoint(State(state.clone()), Ok(Json(request)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fs::read(state.ledger.path()).unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn blank_comment_is_rejected() {
        let (_dir, state) = get_test_state();
        let request = TransactionRequest {
            amount: 3.0,
            date: None,
            comment: " \n ".to_owned(),
        };

        let response = create_transaction_endpoint(State(state.clone()), Ok(Json(request)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.ledger.current_balance().balance, 0.0);
    }

    #[tokio::test]
    async fn storage_failure_is_a_server_error() {
        let (_dir, state) = get_test_state();
        fs::remove_file(state.ledger.path()).unwrap();
        let request = TransactionRequest {
            amount: 3.0,
            date: None,
            comment: "lost".to_owned(),
        };

        let response = create_transaction_endpoint(State(state.clone()), Ok(Json(request)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.ledger.current_balance().balance, 0.0);
    }
}
