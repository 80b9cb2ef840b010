//! Bearer token authentication for the API routes that change the ledger.

mod middleware;
mod token;

pub use middleware::{AuthState, bearer_auth_guard};
pub use token::TokenDigest;
