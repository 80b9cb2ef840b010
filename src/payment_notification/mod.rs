//! Records payments reported by PayPal Instant Payment Notifications (IPN).
//!
//! Each verified notification for the configured receiver and currency is
//! appended to the ledger as one batch: the gross amount followed by the fee.

mod endpoint;
mod notification;
mod verifier;

pub use endpoint::{
    NotificationOutcome, PaymentNotificationState, payment_notification_endpoint,
    process_notification,
};
pub use notification::{FEE_COMMENT, GROSS_COMMENT, PaymentNotification};
pub use verifier::{
    NotificationVerifier, PAYPAL_SANDBOX_VERIFY_URL, PAYPAL_VERIFY_URL, PayPalVerifier,
};
