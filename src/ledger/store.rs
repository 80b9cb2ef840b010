//! The ledger store: an append-only file of transactions with a cached balance.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::{
    Error,
    balance::Balance,
    ledger::record::{LogTail, TailScanner, encode_batch, records},
    transaction::Transaction,
};

/// A durable, append-only record of transactions and the balance they add up
/// to.
///
/// The file at [Ledger::path] is the only source of truth. The balance held in
/// memory is a cache of the sum of every record in that file and is only
/// updated after a batch has been written and synced to disk.
///
/// One `Ledger` should be created at startup and shared (e.g., in an `Arc`)
/// with everything that reads or appends transactions.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    /// Guards both the cache and appends to the file. Appends hold the write
    /// lock from opening the file until the cache has been updated.
    state: RwLock<Cache>,
}

#[derive(Debug)]
struct Cache {
    balance: f64,
    /// How the file ends, `None` after a failed write left it unknown.
    tail: Option<LogTail>,
}

/// The result of comparing the cached balance against the ledger file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerAudit {
    /// The number of records in the ledger file.
    pub records: u64,
    /// The balance reconstructed from the ledger file.
    pub on_disk_balance: f64,
    /// The balance that is currently served to readers.
    pub cached_balance: f64,
}

impl LedgerAudit {
    /// Whether the cached balance matches the ledger file exactly.
    pub fn is_consistent(&self) -> bool {
        self.on_disk_balance == self.cached_balance
    }

    /// How far the ledger file is ahead of the cached balance.
    pub fn drift(&self) -> f64 {
        self.on_disk_balance - self.cached_balance
    }
}

impl Ledger {
    /// Open the ledger at `path` and reconstruct the balance from its records.
    ///
    /// The file, and any missing parent directories, are created if they do not
    /// exist. An empty ledger has a balance of zero. A last record without a
    /// line terminator is accepted, the next append starts on a new line.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::StorageUnavailable] if the file cannot be created or read,
    /// - or [Error::CorruptLedger] if any record cannot be parsed, or the file
    ///   ends inside a quoted field. No balance is guessed for a ledger in this
    ///   state.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |error: io::Error| Error::StorageUnavailable {
            path: path.display().to_string(),
            reason: error.to_string(),
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(unavailable)?;

        let replayed = replay(file, &path)?;

        if replayed.tail == LogTail::OpenQuote {
            return Err(Error::CorruptLedger {
                line: replayed.last_line,
                reason: "the last record ends inside a quoted field".to_owned(),
            });
        }

        tracing::info!(
            "Loaded {} transactions from {}, balance is {}",
            replayed.records,
            path.display(),
            replayed.balance
        );

        Ok(Self {
            path,
            state: RwLock::new(Cache {
                balance: replayed.balance,
                tail: Some(replayed.tail),
            }),
        })
    }

    /// The path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sum of every transaction appended to the ledger.
    ///
    /// Readers never block each other and never see a partially applied batch.
    pub fn current_balance(&self) -> Balance {
        // The cached value is only assigned after a batch has been fully
        // written, so it is still valid if a writer panicked.
        let cache = self.state.read().unwrap_or_else(PoisonError::into_inner);

        Balance::new(cache.balance)
    }

    /// Append `transactions` to the ledger as one batch.
    ///
    /// The records are written in order, then the file is flushed and synced
    /// before the cached balance is increased by the batch's amounts. Readers see
    /// either none or all of the batch. An empty batch does nothing.
    ///
    /// # Errors
    /// Returns [Error::StorageWrite] if a transaction cannot be encoded, the
    /// file cannot be opened, written, or synced, or the file ends inside a torn
    /// quoted record that would swallow the batch. The cached balance is left
    /// unchanged, even if some records of the batch reached the file. Callers
    /// may retry the whole batch.
    pub fn append(&self, transactions: &[Transaction]) -> Result<(), Error> {
        if transactions.is_empty() {
            return Ok(());
        }

        let bytes = encode_batch(transactions)?;

        let mut cache = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let tail = match cache.tail {
            Some(tail) => tail,
            None => scan_tail(&self.path)?,
        };
        cache.tail = Some(tail);

        let separator: &[u8] = match tail {
            LogTail::Terminated => b"",
            LogTail::Unterminated => b"\n",
            LogTail::OpenQuote => {
                return Err(Error::StorageWrite(format!(
                    "{} ends inside a quoted field and must be repaired by hand",
                    self.path.display()
                )));
            }
        };

        if let Err(error) = write_and_sync(&self.path, separator, &bytes) {
            cache.tail = None;
            return Err(error);
        }
        cache.tail = Some(LogTail::Terminated);

        // Add the amounts one at a time, in order, so the cache goes through the
        // same floating point operations as a replay of the file.
        cache.balance = transactions
            .iter()
            .fold(cache.balance, |sum, transaction| sum + transaction.amount);

        Ok(())
    }

    /// Replay the ledger file and compare it against the cached balance.
    ///
    /// Appends are blocked while the file is read so the comparison is exact.
    /// The cached balance is never changed, a drift is only reported.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::StorageUnavailable] if the file cannot be read,
    /// - or [Error::CorruptLedger] if any record cannot be parsed.
    pub fn audit(&self) -> Result<LedgerAudit, Error> {
        let cache = self.state.read().unwrap_or_else(PoisonError::into_inner);

        let file = File::open(&self.path).map_err(|error| Error::StorageUnavailable {
            path: self.path.display().to_string(),
            reason: error.to_string(),
        })?;
        let replayed = replay(file, &self.path)?;

        Ok(LedgerAudit {
            records: replayed.records,
            on_disk_balance: replayed.balance,
            cached_balance: cache.balance,
        })
    }
}

/// Read every transaction in the ledger file at `path`.
///
/// Unlike [Ledger::open], the file is not created if it does not exist.
///
/// # Errors
/// This function will return a:
/// - [Error::StorageUnavailable] if the file cannot be opened or read,
/// - or [Error::CorruptLedger] if any record cannot be parsed.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<Transaction>, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|error| Error::StorageUnavailable {
        path: path.display().to_string(),
        reason: error.to_string(),
    })?;

    records(file, path).collect()
}

struct Replay {
    records: u64,
    balance: f64,
    tail: LogTail,
    last_line: u64,
}

/// Sum the amounts of every record in `reader`, front to back.
fn replay(reader: impl Read, path: &Path) -> Result<Replay, Error> {
    let mut records = records(TailScanner::new(reader), path);
    let mut count = 0;
    let mut balance = 0.0;

    for transaction in &mut records {
        balance += transaction?.amount;
        count += 1;
    }

    let scanner = records.get_ref();

    Ok(Replay {
        records: count,
        balance,
        tail: scanner.tail(),
        last_line: scanner.line(),
    })
}

/// Find out how the file at `path` ends without decoding its records.
fn scan_tail(path: &Path) -> Result<LogTail, Error> {
    let read_error =
        |error: io::Error| Error::StorageWrite(format!("could not read {}: {error}", path.display()));

    let mut scanner = TailScanner::new(File::open(path).map_err(read_error)?);
    io::copy(&mut scanner, &mut io::sink()).map_err(read_error)?;

    Ok(scanner.tail())
}

fn write_and_sync(path: &Path, separator: &[u8], bytes: &[u8]) -> Result<(), Error> {
    // The file is not created here: if it has gone missing since the ledger was
    // opened, a new file would no longer add up to the cached balance.
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|error| {
            Error::StorageWrite(format!("could not open {}: {error}", path.display()))
        })?;

    file.write_all(separator)
        .and_then(|()| file.write_all(bytes))
        .map_err(|error| Error::StorageWrite(format!("could not write records: {error}")))?;
    file.flush()
        .map_err(|error| Error::StorageWrite(format!("could not flush records: {error}")))?;
    file.sync_data()
        .map_err(|error| Error::StorageWrite(format!("could not sync records: {error}")))?;

    Ok(())
}
