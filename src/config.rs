//! Command line and environment configuration for the server.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

use crate::payment_notification::{PAYPAL_SANDBOX_VERIFY_URL, PAYPAL_VERIFY_URL};

/// The REST API server for tally_rs.
///
/// Every option can also be set with the environment variable shown next to
/// it. Command line arguments take precedence: when both are given, the flag
/// wins over the `TALLY_*` variable. Deployment scripts that relied on an
/// environment variable overriding a flag have to drop the flag instead.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// File path to the transaction ledger, created if it does not exist.
    #[arg(long, env = "TALLY_DB", default_value = "./transactions.csv")]
    pub db: PathBuf,

    /// The address to serve the API from.
    #[arg(long, env = "TALLY_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// The token that clients must send as `Authorization: Bearer <token>` to
    /// record transactions.
    #[arg(long, env = "TALLY_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,

    /// The PayPal account email that payments must be addressed to.
    #[arg(long, env = "TALLY_PAYPAL_EMAIL")]
    pub paypal_email: String,

    /// The currency code that payments must be made in, e.g. "EUR".
    #[arg(long, env = "TALLY_PAYPAL_CURRENCY")]
    pub paypal_currency: String,

    /// The directory with the static files for the web page.
    #[arg(long, env = "TALLY_STATIC_DIR", default_value = "./static")]
    pub static_dir: PathBuf,

    /// The URL that live payment notifications are verified against.
    #[arg(long, env = "TALLY_IPN_VERIFY_URL", default_value = PAYPAL_VERIFY_URL)]
    pub ipn_verify_url: String,

    /// The URL that sandbox payment notifications are verified against.
    #[arg(
        long,
        env = "TALLY_IPN_SANDBOX_VERIFY_URL",
        default_value = PAYPAL_SANDBOX_VERIFY_URL
    )]
    pub ipn_sandbox_verify_url: String,

    /// Also write debug level logs to this file.
    #[arg(long, env = "TALLY_DEBUG_LOG")]
    pub debug_log: Option<PathBuf>,
}
