//! Wallet record storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database
//!
//! Both backends enforce one wallet per owner and one link per
//! (owner, address) pair; a violation surfaces as [`StoreError::Conflict`].

mod memory;
mod sqlite;

pub use memory::InMemoryWalletStore;
pub use sqlite::SqliteWalletStore;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::error::WAuthError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

impl From<StoreError> for WAuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => WAuthError::Conflict(msg),
            StoreError::Backend(msg) => WAuthError::Storage(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A custodied wallet as persisted.
///
/// Not `Serialize`: the only way out of the server is
/// [`crate::visibility::enrich_wallet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRecord {
    pub id: String,
    pub owner: String,
    pub encrypted_jwk: String,
    pub salt: String,
    pub public_key: String,
    pub address: String,
    pub created: String,
    pub updated: String,
}

/// Fields of a wallet ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewWallet {
    pub owner: String,
    pub encrypted_jwk: String,
    pub salt: String,
    pub public_key: String,
    pub address: String,
}

/// An externally held wallet linked to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedWallet {
    pub id: String,
    pub owner: String,
    pub address: String,
    pub public_key: String,
    /// Base64 proof that was verified when the link was created
    pub signature: String,
    pub created: String,
}

#[derive(Debug, Clone)]
pub struct NewConnectedWallet {
    pub owner: String,
    pub address: String,
    pub public_key: String,
    pub signature: String,
}

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Generate a record id.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Wallet store trait - implemented by all storage backends.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Get the wallet owned by an identity, if any.
    async fn find_wallet_by_owner(&self, owner: &str) -> StoreResult<Option<WalletRecord>>;

    /// Get a single wallet by ID.
    async fn get_wallet(&self, id: &str) -> StoreResult<Option<WalletRecord>>;

    /// Insert a wallet. Fails with `Conflict` if the owner already has one.
    async fn insert_wallet(&self, wallet: NewWallet) -> StoreResult<WalletRecord>;

    /// List connected wallets owned by an identity, newest first.
    async fn list_connected_wallets(&self, owner: &str) -> StoreResult<Vec<ConnectedWallet>>;

    /// Insert a connected wallet. Fails with `Conflict` if the owner already linked the address.
    async fn insert_connected_wallet(
        &self,
        wallet: NewConnectedWallet,
    ) -> StoreResult<ConnectedWallet>;

    /// Delete a connected wallet if and only if `owner` owns it.
    ///
    /// Returns `false` when the row does not exist or belongs to someone else.
    async fn delete_connected_wallet(&self, owner: &str, id: &str) -> StoreResult<bool>;
}

/// Shared store handle.
pub type SharedWalletStore = Arc<dyn WalletStore>;

/// Store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    #[default]
    Sqlite,
}

impl StoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a wallet store based on type and configuration.
pub async fn create_wallet_store(
    store_type: StoreType,
    base_dir: PathBuf,
) -> StoreResult<SharedWalletStore> {
    match store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryWalletStore::new())),
        StoreType::Sqlite => {
            let store = SqliteWalletStore::new(base_dir).await?;
            Ok(Arc::new(store))
        }
    }
}
