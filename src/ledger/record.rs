//! Encodes transactions as ledger records and decodes them again.
//!
//! A record is one CSV row with exactly three fields:
//!
//! ```text
//! <amount>,<date>,<comment>
//! ```
//!
//! The amount is written as the shortest decimal that parses back to the same
//! `f64`, the date as an RFC 3339 timestamp with its offset, and the comment
//! verbatim. Comments containing commas, quotes or line breaks are quoted by
//! the CSV writer so they survive a round trip.

use std::{
    io::{self, Read},
    path::Path,
};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Terminator, WriterBuilder};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    transaction::{Transaction, truncate_to_seconds},
};

/// The number of fields in every ledger record.
pub const FIELD_COUNT: usize = 3;

/// Encode `transactions` as ledger records, one line per transaction, in order.
///
/// The whole batch is encoded before anything touches the ledger file, so a
/// transaction that cannot be encoded never results in a partial write.
///
/// # Errors
/// Returns [Error::StorageWrite] if any transaction has a non-finite amount or
/// a date that cannot be formatted as RFC 3339.
pub fn encode_batch(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for transaction in transactions {
        let fields = encode_fields(transaction)?;

        writer
            .write_record(&fields)
            .map_err(|error| Error::StorageWrite(format!("could not encode record: {error}")))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::StorageWrite(format!("could not encode records: {error}")))
}

fn encode_fields(transaction: &Transaction) -> Result<[String; FIELD_COUNT], Error> {
    if !transaction.amount.is_finite() {
        return Err(Error::StorageWrite(format!(
            "the amount {} cannot be recorded",
            transaction.amount
        )));
    }

    let date = truncate_to_seconds(transaction.date)
        .format(&Rfc3339)
        .map_err(|error| {
            Error::StorageWrite(format!(
                "the date {} cannot be recorded: {error}",
                transaction.date
            ))
        })?;

    // `Display` for `f64` prints the shortest representation that round trips
    // and never uses exponent notation.
    Ok([
        transaction.amount.to_string(),
        date,
        transaction.comment.clone(),
    ])
}

/// Decode the records in `reader` lazily, front to back.
///
/// Blank lines are skipped. `path` names the ledger in read errors.
pub fn records<R: Read>(reader: R, path: &Path) -> Records<R> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        // Field counts are checked per record so that short rows are reported
        // as corrupt rather than silently accepted.
        .flexible(true)
        .from_reader(reader);

    Records {
        inner: reader.into_records(),
        path: path.display().to_string(),
        records_read: 0,
    }
}

/// An iterator over the transactions stored in a ledger.
///
/// Created by [records].
pub struct Records<R> {
    inner: StringRecordsIntoIter<R>,
    path: String,
    records_read: u64,
}

impl<R: Read> Records<R> {
    /// The reader that records are decoded from.
    pub fn get_ref(&self) -> &R {
        self.inner.reader().get_ref()
    }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Transaction, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.inner.next()?;
        self.records_read += 1;
        let fallback_line = self.records_read;

        let decoded = match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line);

                decode_record(&record, line)
            }
            // The bytes may be fine, only reading them failed.
            Err(error) if error.is_io_error() => Err(Error::StorageUnavailable {
                path: self.path.clone(),
                reason: error.to_string(),
            }),
            Err(error) => {
                let line = error
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line);

                Err(Error::CorruptLedger {
                    line,
                    reason: error.to_string(),
                })
            }
        };

        Some(decoded)
    }
}

/// Decode a single ledger record found on `line`.
///
/// # Errors
/// Returns [Error::CorruptLedger] if the record does not have exactly three
/// fields, if the amount is not a finite number, or if the date is not a valid
/// RFC 3339 timestamp.
pub fn decode_record(record: &StringRecord, line: u64) -> Result<Transaction, Error> {
    if record.len() != FIELD_COUNT {
        return Err(Error::CorruptLedger {
            line,
            reason: format!("expected {FIELD_COUNT} fields, got {}", record.len()),
        });
    }

    let amount_text = &record[0];
    let amount: f64 = amount_text.parse().map_err(|error| Error::CorruptLedger {
        line,
        reason: format!("amount \"{amount_text}\" is not a number: {error}"),
    })?;

    if !amount.is_finite() {
        return Err(Error::CorruptLedger {
            line,
            reason: format!("amount \"{amount_text}\" is not a finite number"),
        });
    }

    let date_text = &record[1];
    let date = OffsetDateTime::parse(date_text, &Rfc3339).map_err(|error| Error::CorruptLedger {
        line,
        reason: format!("date \"{date_text}\" is not an RFC 3339 timestamp: {error}"),
    })?;

    Ok(Transaction {
        amount,
        date,
        comment: record[2].to_owned(),
    })
}

/// How the bytes at the end of a ledger file leave the last record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogTail {
    /// The file is empty or ends with a line terminator.
    Terminated,
    /// The last record has no line terminator. The next record must start on
    /// a new line.
    Unterminated,
    /// The file ends inside a quoted field, so anything appended would become
    /// part of that field.
    OpenQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    /// A quote inside a quoted field, either closing it or escaping the next
    /// quote.
    QuotedQuote,
}

/// Follows the bytes of a ledger as they are read to find out how the file
/// ends.
#[derive(Debug)]
pub(crate) struct TailScanner<R> {
    inner: R,
    state: FieldState,
    last_byte: Option<u8>,
    newlines: u64,
}

impl<R> TailScanner<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            state: FieldState::Start,
            last_byte: None,
            newlines: 0,
        }
    }

    /// How the bytes read so far end.
    pub(crate) fn tail(&self) -> LogTail {
        match (self.state, self.last_byte) {
            (FieldState::Quoted, _) => LogTail::OpenQuote,
            (_, None | Some(b'\n')) => LogTail::Terminated,
            _ => LogTail::Unterminated,
        }
    }

    /// The 1-based line that the bytes read so far end on.
    pub(crate) fn line(&self) -> u64 {
        self.newlines + 1
    }

    fn observe(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = match (self.state, byte) {
                (FieldState::Quoted, b'"') => FieldState::QuotedQuote,
                (FieldState::Quoted, _) => FieldState::Quoted,
                (FieldState::QuotedQuote, b'"') => FieldState::Quoted,
                (FieldState::Start, b'"') => FieldState::Quoted,
                (_, b',' | b'\n') => FieldState::Start,
                _ => FieldState::Unquoted,
            };

            if byte == b'\n' {
                self.newlines += 1;
            }
        }

        if let Some(&last) = bytes.last() {
            self.last_byte = Some(last);
        }
    }
}

impl<R: Read> Read for TailScanner<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.observe(&buf[..read]);

        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Read},
        path::Path,
    };

    use proptest::prelude::*;
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        ledger::record::{LogTail, TailScanner, encode_batch, records},
        transaction::Transaction,
    };

    fn decode_all(bytes: &[u8]) -> Result<Vec<Transaction>, Error> {
        records(bytes, Path::new("transactions.csv")).collect()
    }

    fn tail_of(text: &str) -> LogTail {
        let mut scanner = TailScanner::new(text.as_bytes());
        io::copy(&mut scanner, &mut io::sink()).unwrap();

        scanner.tail()
    }

    /// Returns `data` on the first read and fails every read after that.
    struct FailingReader {
        data: Option<&'static [u8]>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.take() {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(io::Error::other("input/output error")),
            }
        }
    }

    #[test]
    fn read_failures_are_not_reported_as_corruption() {
        let reader = FailingReader {
            data: Some(&b"1,2024-03-01T10:00:00Z,a\n"[..]),
        };

        let result: Result<Vec<_>, _> = records(reader, Path::new("transactions.csv")).collect();

        assert!(
            matches!(
                &result,
                Err(Error::StorageUnavailable { path, .. }) if path == "transactions.csv"
            ),
            "got {result:?}"
        );
    }

    #[test]
    fn finds_how_the_log_ends() {
        assert_eq!(tail_of(""), LogTail::Terminated);
        assert_eq!(tail_of("1,2024-03-01T10:00:00Z,a\n"), LogTail::Terminated);
        assert_eq!(tail_of("1,2024-03-01T10:00:00Z,a"), LogTail::Unterminated);
        assert_eq!(
            tail_of("1,2024-03-01T10:00:00Z,\"line one\nline two\"\n"),
            LogTail::Terminated
        );
        assert_eq!(
            tail_of("1,2024-03-01T10:00:00Z,\"say \"\"hi\"\"\""),
            LogTail::Unterminated
        );
        assert_eq!(tail_of("1,2024-03-01T10:00:00Z,6\" screen"), LogTail::Unterminated);
        assert_eq!(tail_of("1,2024-03-01T10:00:00Z,\"ab"), LogTail::OpenQuote);
        assert_eq!(
            tail_of("1,2024-03-01T10:00:00Z,\"line one\nline"),
            LogTail::OpenQuote
        );
    }

    #[test]
    fn encodes_one_line_per_transaction() {
        let batch = [
            Transaction::new(25.0, datetime!(2024-03-01 10:00:00 UTC), "gross"),
            Transaction::new(-1.2, datetime!(2024-03-01 10:00:00 UTC), "fee"),
        ];

        let bytes = encode_batch(&batch).unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "25,2024-03-01T10:00:00Z,gross\n-1.2,2024-03-01T10:00:00Z,fee\n"
        );
    }

    #[test]
    fn encodes_dates_with_their_offset_to_the_second() {
        let batch = [Transaction::new(
            3.5,
            datetime!(2024-03-01 10:00:00.123456 -07:00),
            "a",
        )];

        let bytes = encode_batch(&batch).unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "3.5,2024-03-01T10:00:00-07:00,a\n"
        );
    }

    #[test]
    fn escapes_separators_and_line_breaks_in_comments() {
        let comment = "thanks, \"friend\"\nsee you\r\nsoon";
        let batch = [Transaction::new(1.0, datetime!(2024-03-01 10:00:00 UTC), comment)];

        let bytes = encode_batch(&batch).unwrap();
        let decoded = decode_all(&bytes).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].comment, comment);
    }

    #[test]
    fn keeps_amounts_at_full_precision() {
        let amount = 0.1 + 0.2;
        let batch = [Transaction::new(amount, datetime!(2024-03-01 10:00:00 UTC), "x")];

        let decoded = decode_all(&encode_batch(&batch).unwrap()).unwrap();

        assert_eq!(decoded[0].amount.to_bits(), amount.to_bits());
    }

    #[test]
    fn refuses_to_encode_non_finite_amounts() {
        let batch = [
            Transaction::new(1.0, datetime!(2024-03-01 10:00:00 UTC), "fine"),
            Transaction::new(f64::NAN, datetime!(2024-03-01 10:00:00 UTC), "broken"),
        ];

        let result = encode_batch(&batch);

        assert!(matches!(result, Err(Error::StorageWrite(_))), "got {result:?}");
    }

    #[test]
    fn rejects_records_with_two_fields() {
        let text = "10.5,2024-03-01T10:00:00Z,a\n25,2024-03-01T10:00:00Z\n";

        let result = decode_all(text.as_bytes());

        assert_eq!(
            result,
            Err(Error::CorruptLedger {
                line: 2,
                reason: "expected 3 fields, got 2".to_owned()
            })
        );
    }

    #[test]
    fn rejects_records_with_four_fields() {
        let text = "10.5,2024-03-01T10:00:00Z,a,b\n";

        let result = decode_all(text.as_bytes());

        assert!(
            matches!(result, Err(Error::CorruptLedger { line: 1, .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        let text = "ten,2024-03-01T10:00:00Z,a\n";

        let result = decode_all(text.as_bytes());

        assert!(
            matches!(result, Err(Error::CorruptLedger { line: 1, .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn rejects_non_finite_amounts() {
        let text = "NaN,2024-03-01T10:00:00Z,a\n";

        let result = decode_all(text.as_bytes());

        assert!(
            matches!(result, Err(Error::CorruptLedger { line: 1, .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        let text = "1,yesterday,a\n";

        let result = decode_all(text.as_bytes());

        assert!(
            matches!(result, Err(Error::CorruptLedger { line: 1, .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn skips_blank_lines() {
        let text = "1,2024-03-01T10:00:00Z,a\n\n2,2024-03-01T10:00:00Z,b\n";

        let decoded = decode_all(text.as_bytes()).unwrap();

        assert_eq!(decoded.len(), 2);
    }

    fn any_transaction() -> impl Strategy<Value = Transaction> {
        (
            any::<f64>().prop_filter("amount must be finite", |amount| amount.is_finite()),
            // Whole seconds between 1970 and a few days before the end of 9999,
            // so any offset keeps the local date within four digit years.
            0i64..253_402_000_000,
            -86_399i32..86_399,
            ".*",
        )
            .prop_map(|(amount, timestamp, offset_seconds, comment)| {
                let offset = time::UtcOffset::from_whole_seconds(offset_seconds - offset_seconds % 60)
                    .expect("offset is in range");
                let date = OffsetDateTime::from_unix_timestamp(timestamp)
                    .expect("timestamp is in range")
                    .to_offset(offset);

                Transaction::new(amount, date, &comment)
            })
    }

    proptest! {
        #[test]
        fn decoding_an_encoded_batch_gives_back_the_batch(
            batch in proptest::collection::vec(any_transaction(), 1..8)
        ) {
            let bytes = encode_batch(&batch).unwrap();
            let decoded = decode_all(&bytes).unwrap();

            prop_assert_eq!(decoded.len(), batch.len());

            for (got, want) in decoded.iter().zip(&batch) {
                prop_assert_eq!(got.amount.to_bits(), want.amount.to_bits());
                prop_assert_eq!(got.date, want.date);
                prop_assert_eq!(got.date.offset(), want.date.offset());
                prop_assert_eq!(&got.comment, &want.comment);
            }
        }
    }
}
