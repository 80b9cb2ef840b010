//! Application router configuration with protected and unprotected route definitions.

use std::path::Path;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::bearer_auth_guard,
    balance::get_balance_endpoint,
    endpoints,
    payment_notification::payment_notification_endpoint,
    transaction::create_transaction_endpoint,
};

/// Return a router with all the app's routes.
///
/// Requests that do not match an API route are served from `static_dir`.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::BALANCE, get(get_balance_endpoint))
        .route(
            endpoints::PAYMENT_NOTIFICATIONS,
            post(payment_notification_endpoint),
        );

    let protected_routes = Router::new()
        .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_guard,
        ));

    protected_routes
        .merge(unprotected_routes)
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}
