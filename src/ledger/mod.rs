//! The transaction ledger: the append-only log file, its record format, and the
//! cached balance that is reconstructed from it.

mod record;
mod store;

pub use record::{FIELD_COUNT, Records, decode_record, encode_batch, records};
pub use store::{Ledger, LedgerAudit, read_log};
