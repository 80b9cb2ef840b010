//! Appends batches of transactions to the ledger and logs what happened.

use crate::{Error, ledger::Ledger, transaction::Transaction};

/// Append `batch` to `ledger` and log the outcome.
///
/// On failure the ledger is audited so that records that reached the file
/// without being added to the cached balance show up in the logs.
///
/// # Errors
/// Returns the error from [Ledger::append] unchanged.
pub fn append_transactions(ledger: &Ledger, batch: &[Transaction]) -> Result<(), Error> {
    if let Err(error) = ledger.append(batch) {
        tracing::error!("could not save {} transaction(s): {error}", batch.len());

        match ledger.audit() {
            Ok(audit) if !audit.is_consistent() => tracing::error!(
                "ledger file is {} ahead of the cached balance {} until the next restart",
                audit.drift(),
                audit.cached_balance
            ),
            Ok(_) => {}
            Err(audit_error) => tracing::error!("could not audit the ledger: {audit_error}"),
        }

        return Err(error);
    }

    for transaction in batch {
        tracing::info!("append transaction: {transaction}");
    }

    Ok(())
}
