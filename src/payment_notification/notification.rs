//! Parses PayPal Instant Payment Notifications (IPN).

use serde::Deserialize;
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::BorrowedFormatItem,
    macros::{format_description, offset},
};

use crate::{Error, transaction::Transaction};

/// The comment recorded for the money received in a payment.
pub const GROSS_COMMENT: &str = "PayPal donation";
/// The comment recorded for the fee the payment provider kept.
pub const FEE_COMMENT: &str = "PayPal fee";

/// The form fields of an IPN message that are needed to record a payment.
///
/// All other fields are ignored.
#[derive(Debug, Deserialize)]
struct NotificationForm {
    business: Option<String>,
    receiver_email: Option<String>,
    mc_currency: Option<String>,
    mc_gross: Option<String>,
    mc_fee: Option<String>,
    payment_date: Option<String>,
    test_ipn: Option<String>,
    txn_id: Option<String>,
}

/// A payment that the payment provider notified us about.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    /// The email address of the account that received the payment.
    pub receiver: String,
    /// The currency code of the payment, e.g. "EUR".
    pub currency: String,
    /// The full amount paid, before fees.
    pub gross: f64,
    /// The fee kept by the payment provider.
    pub fee: f64,
    /// When the payment was made.
    pub payment_date: OffsetDateTime,
    /// Whether the notification came from the sandbox.
    pub test: bool,
    /// The payment provider's ID for the payment, only used for logging.
    pub transaction_id: Option<String>,
}

impl PaymentNotification {
    /// Parse the `application/x-www-form-urlencoded` body of an IPN message.
    ///
    /// # Errors
    /// Returns [Error::InvalidNotification] if the body is not a form, or a
    /// required field is missing or malformed.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let form: NotificationForm = serde_urlencoded::from_bytes(body)
            .map_err(|error| Error::InvalidNotification(error.to_string()))?;

        let receiver = form
            .business
            .filter(|business| !business.is_empty())
            .or(form.receiver_email)
            .ok_or_else(|| missing("business"))?;
        let currency = form.mc_currency.ok_or_else(|| missing("mc_currency"))?;
        let gross = parse_amount(
            "mc_gross",
            form.mc_gross.as_deref().ok_or_else(|| missing("mc_gross"))?,
        )?;
        let fee = match form.mc_fee.as_deref() {
            Some(fee) if !fee.is_empty() => parse_amount("mc_fee", fee)?,
            _ => 0.0,
        };
        let payment_date = parse_payment_date(
            form.payment_date
                .as_deref()
                .ok_or_else(|| missing("payment_date"))?,
        )?;

        Ok(Self {
            receiver,
            currency,
            gross,
            fee,
            payment_date,
            test: form.test_ipn.as_deref() == Some("1"),
            transaction_id: form.txn_id,
        })
    }

    /// The batch to append to the ledger for this payment: the gross amount as a
    /// credit followed by the fee as a debit.
    ///
    /// The fee is left out if the payment provider did not charge one.
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut batch = vec![Transaction::new(
            self.gross,
            self.payment_date,
            GROSS_COMMENT,
        )];

        if self.fee != 0.0 {
            batch.push(Transaction::new(-self.fee, self.payment_date, FEE_COMMENT));
        }

        batch
    }
}

fn missing(field: &str) -> Error {
    Error::InvalidNotification(format!("missing field \"{field}\""))
}

fn parse_amount(field: &str, text: &str) -> Result<f64, Error> {
    match text.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(Error::InvalidNotification(format!(
            "field \"{field}\" is not an amount: \"{text}\""
        ))),
    }
}

/// Parse a payment date like `08:41:22 Jan 07, 2019 PST`.
///
/// The payment provider always reports dates in Pacific time.
fn parse_payment_date(text: &str) -> Result<OffsetDateTime, Error> {
    const DATE_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[hour]:[minute]:[second] [month repr:short] [day padding:none], [year]"
    );

    let invalid = || Error::InvalidNotification(format!("invalid payment date \"{text}\""));

    let (date_time, zone) = text.trim().rsplit_once(' ').ok_or_else(invalid)?;

    let offset: UtcOffset = match zone {
        "PST" => offset!(-8),
        "PDT" => offset!(-7),
        "UTC" | "GMT" => UtcOffset::UTC,
        _ => return Err(invalid()),
    };

    let date_time = PrimitiveDateTime::parse(date_time, &DATE_FORMAT).map_err(|_| invalid())?;

    Ok(date_time.assume_offset(offset))
}
