//! Confirms with the payment provider that a notification is genuine.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::Error;

/// The endpoint that verifies notifications for live payments.
pub const PAYPAL_VERIFY_URL: &str = "https://ipnpb.paypal.com/cgi-bin/webscr";
/// The endpoint that verifies notifications sent from the sandbox.
pub const PAYPAL_SANDBOX_VERIFY_URL: &str = "https://ipnpb.sandbox.paypal.com/cgi-bin/webscr";

/// Checks that a payment notification was really sent by the payment provider.
#[async_trait]
pub trait NotificationVerifier: Debug + Send + Sync {
    /// Verify the raw, unmodified notification `body`.
    ///
    /// `sandbox` selects the provider's test environment.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotificationNotVerified] if the provider does not recognise the
    ///   notification,
    /// - or [Error::VerificationUnavailable] if the provider cannot be reached.
    async fn verify(&self, body: &[u8], sandbox: bool) -> Result<(), Error>;
}

/// Verifies notifications by posting them back to PayPal.
///
/// PayPal answers `VERIFIED` if it sent the message, and `INVALID` otherwise.
#[derive(Debug, Clone)]
pub struct PayPalVerifier {
    client: reqwest::Client,
    verify_url: String,
    sandbox_verify_url: String,
}

impl PayPalVerifier {
    /// Create a verifier that posts live notifications to `verify_url` and
    /// sandbox notifications to `sandbox_verify_url`.
    ///
    /// # Errors
    /// Returns [Error::VerificationUnavailable] if the HTTP client cannot be
    /// created.
    pub fn new(verify_url: &str, sandbox_verify_url: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| Error::VerificationUnavailable(error.to_string()))?;

        Ok(Self {
            client,
            verify_url: verify_url.to_owned(),
            sandbox_verify_url: sandbox_verify_url.to_owned(),
        })
    }
}

#[async_trait]
impl NotificationVerifier for PayPalVerifier {
    async fn verify(&self, body: &[u8], sandbox: bool) -> Result<(), Error> {
        let url = if sandbox {
            &self.sandbox_verify_url
        } else {
            &self.verify_url
        };

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(verification_body(body))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| Error::VerificationUnavailable(error.to_string()))?;

        let reply = response
            .text()
            .await
            .map_err(|error| Error::VerificationUnavailable(error.to_string()))?;

        if reply.trim() == "VERIFIED" {
            Ok(())
        } else {
            Err(Error::NotificationNotVerified(reply.trim().to_owned()))
        }
    }
}

/// The message to post back: the original body prefixed with the validation
/// command, with the fields in their original order.
fn verification_body(body: &[u8]) -> Vec<u8> {
    const COMMAND: &[u8] = b"cmd=_notify-validate";

    let mut message = Vec::with_capacity(COMMAND.len() + 1 + body.len());
    message.extend_from_slice(COMMAND);

    if !body.is_empty() {
        message.push(b'&');
        message.extend_from_slice(body);
    }

    message
}
