//! HTTP API for WAuth.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/wallets` - Create the caller's wallet (encrypted password headers required)
//! - `GET /api/wallets` - The caller's wallet, key material redacted
//! - `GET /api/wallets/{id}` - One wallet owned by the caller
//! - `GET /api/connected-wallets` - List linked external wallets
//! - `POST /api/connected-wallets` - Link an external wallet with a signed proof
//! - `DELETE /api/connected-wallets/{id}` - Unlink an external wallet
//!
//! Everything except the health check requires a bearer token.

mod auth;
mod connected_wallets;
mod routes;
pub mod types;
mod wallets;

pub use auth::{issue_token, AuthUser};
pub use routes::{router, serve, AppState};
pub use types::*;

#[cfg(test)]
mod tests;
