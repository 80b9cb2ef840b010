//! Defines the core data model for transactions.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::Error;

/// An event that changed the balance, i.e. money that was either received or
/// spent.
///
/// Transactions have no identity and are never modified after they have been
/// appended to the ledger. They are ordered only by the order in which they
/// were appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The amount of money received or spent.
    ///
    /// Positive values represent credits, negative values represent debits.
    pub amount: f64,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub comment: String,
}

impl Transaction {
    /// Create a new transaction without any validation.
    ///
    /// The ledger stores whatever it is given, use [Transaction::validated] for
    /// user supplied data.
    pub fn new(amount: f64, date: OffsetDateTime, comment: &str) -> Self {
        Self {
            amount,
            date,
            comment: comment.to_owned(),
        }
    }

    /// Create a new transaction from user supplied data.
    ///
    /// Surrounding whitespace is trimmed from `comment`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ZeroAmount] if `amount` is zero, NaN or infinite,
    /// - or [Error::EmptyComment] if `comment` is empty after trimming.
    pub fn validated(amount: f64, date: OffsetDateTime, comment: &str) -> Result<Self, Error> {
        if amount == 0.0 || !amount.is_finite() {
            return Err(Error::ZeroAmount);
        }

        let comment = comment.trim();

        if comment.is_empty() {
            return Err(Error::EmptyComment);
        }

        Ok(Self::new(amount, date, comment))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .date
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.date.to_string());

        write!(f, "{} ({date}, {:?})", self.amount, self.comment)
    }
}

/// The current time in UTC truncated to whole seconds.
///
/// The ledger only records dates to the second, so dates that are generated
/// by the server are truncated up front.
pub fn now_utc_seconds() -> OffsetDateTime {
    truncate_to_seconds(OffsetDateTime::now_utc())
}

/// Drop the sub-second part of `date`, keeping its offset.
pub fn truncate_to_seconds(date: OffsetDateTime) -> OffsetDateTime {
    date - Duration::nanoseconds(date.nanosecond() as i64)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        Error,
        transaction::{Transaction, core::truncate_to_seconds},
    };

    #[test]
    fn validated_trims_comment() {
        let date = datetime!(2024-05-01 12:00:00 UTC);

        let transaction = Transaction::validated(5.0, date, "  coffee fund \n").unwrap();

        assert_eq!(transaction.comment, "coffee fund");
    }

    #[test]
    fn validated_rejects_zero_amount() {
        let date = datetime!(2024-05-01 12:00:00 UTC);

        assert_eq!(Transaction::validated(0.0, date, "nothing"), Err(Error::ZeroAmount));
        assert_eq!(Transaction::validated(-0.0, date, "nothing"), Err(Error::ZeroAmount));
    }

    #[test]
    fn validated_rejects_non_finite_amount() {
        let date = datetime!(2024-05-01 12:00:00 UTC);

        assert_eq!(
            Transaction::validated(f64::NAN, date, "nothing"),
            Err(Error::ZeroAmount)
        );
        assert_eq!(
            Transaction::validated(f64::INFINITY, date, "nothing"),
            Err(Error::ZeroAmount)
        );
    }

    #[test]
    fn validated_rejects_blank_comment() {
        let date = datetime!(2024-05-01 12:00:00 UTC);

        assert_eq!(Transaction::validated(1.0, date, " \t "), Err(Error::EmptyComment));
    }

    #[test]
    fn truncate_keeps_offset() {
        let date = datetime!(2024-05-01 12:00:00.987654321 +02:00);

        let truncated = truncate_to_seconds(date);

        assert_eq!(truncated, datetime!(2024-05-01 12:00:00 +02:00));
        assert_eq!(truncated.offset(), date.offset());
    }

    #[test]
    fn deserializes_from_json() {
        let transaction: Transaction = serde_json::from_str(
            r#"{"amount": -12.5, "date": "2024-05-01T12:00:00+02:00", "comment": "rent"}"#,
        )
        .unwrap();

        assert_eq!(
            transaction,
            Transaction::new(-12.5, datetime!(2024-05-01 12:00:00 +02:00), "rent")
        );
    }
}
