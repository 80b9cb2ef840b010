//! Tally is a small bookkeeping service for a donation funded project.
//!
//! Every transaction is kept in an append-only CSV ledger and the running
//! balance is cached in memory, so reading the balance never touches the disk.
//! This library provides the ledger store and a REST API around it that
//! records transactions, receives PayPal payment notifications and serves the
//! balance to a static web page.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod balance;
mod config;
mod endpoints;
mod error;
mod routing;
mod transaction;

pub mod ledger;
pub mod payment_notification;

pub use app_state::AppState;
pub use balance::Balance;
pub use config::Config;
pub use error::Error;
pub use ledger::{Ledger, LedgerAudit, read_log};
pub use routing::build_router;
pub use transaction::{Transaction, append_transactions};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Could not listen for ctrl+c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("Could not listen for the terminate signal: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
        },
    }

    // Appends in flight finish before the ledger is dropped.
    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}
