//! # WAuth
//!
//! Web2 sign-in for Arweave wallets.
//!
//! A user signs in with an OAuth provider and gets a custodied Arweave
//! wallet whose key material never leaves the server unencrypted. The same
//! identity can link further wallets it controls by proving possession.
//!
//! ## Architecture
//!
//! ```text
//!   StrategySet ── WAuthStrategy (per provider)
//!                        │
//!                 HttpWalletSession ──── HTTP ────┐
//!                                                 ▼
//!                                       ┌───────────────────┐
//!                                       │  api (axum)       │
//!                                       ├───────────────────┤
//!                                       │ WalletProvisioner │──► key service
//!                                       │ ConnectedWallet-  │
//!                                       │   Registry        │
//!                                       ├───────────────────┤
//!                                       │ WalletStore       │ (sqlite / memory)
//!                                       └───────────────────┘
//! ```
//!
//! ## Modules
//! - `api`: HTTP endpoints, bearer auth and router
//! - `provisioning`: wallet creation and the key-minting client
//! - `registry`: connected wallets and ownership proofs
//! - `store`: wallet records
//! - `visibility`: key-material redaction for outgoing wallets
//! - `client`: per-provider strategies, session and connection reconciliation

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod provisioning;
pub mod registry;
pub mod store;
pub mod util;
pub mod visibility;

pub use client::{Provider, StrategySet, WAuthStrategy};
pub use config::Config;
pub use error::{Result, WAuthError};
