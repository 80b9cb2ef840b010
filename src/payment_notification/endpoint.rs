//! Defines the endpoint that receives payment notifications.
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState, Error,
    ledger::Ledger,
    payment_notification::{NotificationVerifier, PaymentNotification},
    transaction::append_transactions,
};

/// The state needed to record payments.
#[derive(Debug, Clone)]
pub struct PaymentNotificationState {
    /// The ledger to append payments to.
    pub ledger: Arc<Ledger>,
    /// Confirms notifications with the payment provider.
    pub verifier: Arc<dyn NotificationVerifier>,
    /// The account that payments must be addressed to.
    pub receiver: String,
    /// The currency that payments must be made in.
    pub currency: String,
}

impl FromRef<AppState> for PaymentNotificationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
            verifier: state.notification_verifier.clone(),
            receiver: state.payment_receiver.clone(),
            currency: state.payment_currency.clone(),
        }
    }
}

/// What happened to a payment notification that was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The payment was appended to the ledger.
    Recorded,
    /// The notification came from the sandbox and nothing was recorded.
    IgnoredTest,
}

/// Verify a notification and append its payment to the ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidNotification] if the body cannot be parsed,
/// - [Error::NotificationNotVerified] or [Error::VerificationUnavailable] if the
///   notification cannot be confirmed with the payment provider,
/// - [Error::UnexpectedReceiver] or [Error::UnexpectedCurrency] if the payment
///   was not meant for us,
/// - or [Error::StorageWrite] if the payment could not be recorded.
pub async fn process_notification(
    state: &PaymentNotificationState,
    body: &[u8],
) -> Result<NotificationOutcome, Error> {
    let notification = PaymentNotification::parse(body)?;

    state.verifier.verify(body, notification.test).await?;

    if notification.receiver != state.receiver {
        return Err(Error::UnexpectedReceiver(notification.receiver));
    }

    if notification.currency != state.currency {
        return Err(Error::UnexpectedCurrency(notification.currency));
    }

    if notification.test {
        tracing::info!(
            "ipn test: not saving transaction {:?}",
            notification.transaction_id
        );
        return Ok(NotificationOutcome::IgnoredTest);
    }

    append_transactions(&state.ledger, &notification.transactions())?;

    Ok(NotificationOutcome::Recorded)
}

/// A route handler for payment notifications.
///
/// Responds `200 OK` once a notification has been handled, including
/// notifications that were rejected, so that the payment provider does not
/// resend them. Responds with an error status only if the provider should try
/// again later, i.e. when it could not be reached for verification or the
/// ledger could not be written.
pub async fn payment_notification_endpoint(
    State(state): State<PaymentNotificationState>,
    body: Bytes,
) -> Response {
    match process_notification(&state, &body).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(error @ (Error::VerificationUnavailable(_) | Error::StorageWrite(_))) => {
            error.into_response()
        }
        Err(error) => {
            tracing::warn!("ipn failed: {error}");
            StatusCode::OK.into_response()
        }
    }
}
