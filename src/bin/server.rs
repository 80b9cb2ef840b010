use std::{fs::OpenOptions, path::Path, process::ExitCode, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use tally_rs::{
    AppState, Config, Ledger, build_router, graceful_shutdown, payment_notification::PayPalVerifier,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    if let Err(error) = setup_logging(config.debug_log.as_deref()) {
        eprintln!("Could not set up logging: {error}");
        return ExitCode::FAILURE;
    }

    let ledger = match Ledger::open(&config.db) {
        Ok(ledger) => ledger,
        Err(error) => {
            tracing::error!("Could not load the ledger: {error}");
            return ExitCode::FAILURE;
        }
    };

    let verifier = match PayPalVerifier::new(&config.ipn_verify_url, &config.ipn_sandbox_verify_url)
    {
        Ok(verifier) => verifier,
        Err(error) => {
            tracing::error!("Could not create the payment notification verifier: {error}");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::new(
        ledger,
        &config.auth_token,
        &config.paypal_email,
        &config.paypal_currency,
        Arc::new(verifier),
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state, &config.static_dir));

    tracing::info!("HTTP server listening on {}", config.listen);
    if let Err(error) = axum_server::bind(config.listen)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server stopped with an error: {error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Log to stdout at the level set by `RUST_LOG` (info by default) and, if
/// `debug_log` is set, everything at debug level and above to that file.
fn setup_logging(debug_log: Option<&Path>) -> std::io::Result<()> {
    let stdout_log = fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let debug_log = match debug_log {
        Some(path) => {
            let log_file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(log_file))
                    .with_filter(filter::LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Error responses log their own cause.
        .on_failure(());

    router.layer(tracing_layer)
}
