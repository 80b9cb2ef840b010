//! Implements a struct that holds the state of the REST server.

use std::sync::Arc;

use crate::{auth::TokenDigest, ledger::Ledger, payment_notification::NotificationVerifier};

/// The state of the REST server.
///
/// Route handlers take the parts they need through `FromRef` sub-states.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger shared by every request.
    pub ledger: Arc<Ledger>,

    /// The digest of the token that clients must present to record
    /// transactions.
    pub token_digest: TokenDigest,

    /// The account that payment notifications must be addressed to.
    pub payment_receiver: String,

    /// The currency that payment notifications must be in.
    pub payment_currency: String,

    /// Confirms payment notifications with the payment provider.
    pub notification_verifier: Arc<dyn NotificationVerifier>,
}

impl AppState {
    /// Create a new [AppState] around an opened `ledger`.
    pub fn new(
        ledger: Ledger,
        auth_token: &str,
        payment_receiver: &str,
        payment_currency: &str,
        notification_verifier: Arc<dyn NotificationVerifier>,
    ) -> Self {
        Self {
            ledger: Arc::new(ledger),
            token_digest: TokenDigest::new(auth_token),
            payment_receiver: payment_receiver.to_owned(),
            payment_currency: payment_currency.to_owned(),
            notification_verifier,
        }
    }
}
