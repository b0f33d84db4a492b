//! Client side of WAuth: per-provider wallet strategies.
//!
//! - [`WAuthStrategy`] - one OAuth provider presented as an Arweave wallet
//! - [`StrategySet`] - a strategy for every [`Provider`]
//! - [`WalletSession`] / [`HttpWalletSession`] - the authenticated session behind a strategy
//! - [`ConnectionReconciler`] - disconnects a strategy the UI believes is connected
//!   when neither an address nor a persisted session backs it
//! - [`ClientStorage`] - `localStorage`-style persistence for the active
//!   strategy id and the auth session

mod http;
mod listeners;
mod provider;
mod reconcile;
mod session;
mod set;
pub mod storage;
mod strategy;
pub mod types;

pub use http::HttpWalletSession;
pub use listeners::{ListenerSet, Subscription};
pub use provider::Provider;
pub use reconcile::{fix_connection, should_disconnect, ConnectionReconciler};
pub use session::{Authenticator, CredentialSource, OAuthGrant, WalletSession};
pub use set::StrategySet;
pub use storage::{ClientStorage, FileStorage, MemoryStorage, SharedClientStorage};
pub use strategy::{ConnectionState, StrategyInfo, WAuthStrategy};
pub use types::{AuthData, Connection, GatewayConfig, PermissionType};
