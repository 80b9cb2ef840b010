//! The API endpoints URIs.

/// The route for reading the current balance.
pub const BALANCE: &str = "/api/balance";
/// The route for recording a transaction.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route that receives PayPal payment notifications.
pub const PAYMENT_NOTIFICATIONS: &str = "/api/ipn";
