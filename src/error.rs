//! Defines the app level error type and its conversion to HTTP responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// The ledger file could not be created or opened for reading.
    ///
    /// This only happens when opening the ledger and is fatal to startup.
    #[error("could not open the ledger file \"{path}\": {reason}")]
    StorageUnavailable {
        /// The path of the ledger file.
        path: String,
        /// The underlying I/O error as a string.
        reason: String,
    },

    /// A record in the ledger file could not be parsed.
    ///
    /// The balance cannot be reconstructed from a ledger in this state, so the
    /// ledger must be repaired by hand before the server can start.
    #[error("corrupt ledger record on line {line}: {reason}")]
    CorruptLedger {
        /// The 1-based line number of the offending record.
        line: u64,
        /// What was wrong with the record.
        reason: String,
    },

    /// A batch of transactions could not be written to the ledger.
    ///
    /// Some records of the batch may have been physically written before the
    /// failure, but the cached balance is left unchanged.
    #[error("could not write to the ledger: {0}")]
    StorageWrite(String),

    /// The request body could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A transaction was submitted with an amount of zero or a value that is
    /// not a finite number.
    #[error("the transaction amount must be a finite, non-zero number")]
    ZeroAmount,

    /// A transaction was submitted with a comment that is empty after trimming
    /// surrounding whitespace.
    #[error("the transaction comment cannot be empty")]
    EmptyComment,

    /// A payment notification was missing a field or had a malformed field.
    #[error("invalid payment notification: {0}")]
    InvalidNotification(String),

    /// A payment notification was addressed to a different receiver than the
    /// configured one.
    #[error("payment notification for unexpected receiver \"{0}\"")]
    UnexpectedReceiver(String),

    /// A payment notification was in a different currency than the configured
    /// one.
    #[error("payment notification in unexpected currency \"{0}\"")]
    UnexpectedCurrency(String),

    /// The payment provider did not confirm that it sent the notification.
    #[error("payment notification could not be verified, provider replied \"{0}\"")]
    NotificationNotVerified(String),

    /// The payment provider could not be reached to verify a notification.
    #[error("could not reach the payment provider to verify a notification: {0}")]
    VerificationUnavailable(String),
}

impl Error {
    /// The HTTP status code that best describes this error to a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_)
            | Error::ZeroAmount
            | Error::EmptyComment
            | Error::InvalidNotification(_)
            | Error::UnexpectedReceiver(_)
            | Error::UnexpectedCurrency(_)
            | Error::NotificationNotVerified(_) => StatusCode::BAD_REQUEST,
            Error::VerificationUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::StorageUnavailable { .. }
            | Error::CorruptLedger { .. }
            | Error::StorageWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            // The details of storage errors are for the server logs only.
            tracing::error!("An unexpected error occurred: {}", self);
            "Something went wrong, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
