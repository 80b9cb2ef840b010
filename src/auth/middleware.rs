//! Authentication middleware that checks the bearer token of API requests.

use axum::{
    extract::{FromRef, Request, State},
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{AppState, auth::TokenDigest};

/// The state needed for the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The digest of the token that clients must present.
    pub token_digest: TokenDigest,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            token_digest: state.token_digest.clone(),
        }
    }
}

/// Middleware function that checks for a valid `Authorization: Bearer <token>`
/// header.
///
/// The request is executed normally if the token is correct, otherwise
/// `401 Unauthorized` is returned with a `WWW-Authenticate: Bearer` challenge.
pub async fn bearer_auth_guard(
    State(state): State<AuthState>,
    authorization: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    request: Request,
    next: Next,
) -> Response {
    match authorization {
        Ok(TypedHeader(Authorization(bearer))) if state.token_digest.matches(bearer.token()) => {
            next.run(request).await
        }
        Ok(_) => {
            tracing::warn!("Rejected request to {} with wrong token", request.uri());
            unauthorized()
        }
        Err(rejection) => {
            tracing::warn!("Rejected request to {}: {rejection}", request.uri());
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
    )
        .into_response()
}
