//! In-memory wallet store (non-persistent).

use super::{
    new_record_id, now_string, ConnectedWallet, NewConnectedWallet, NewWallet, StoreError,
    StoreResult, WalletRecord, WalletStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<String, WalletRecord>>>,
    connected: Arc<RwLock<HashMap<String, ConnectedWallet>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self {
            wallets: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryWalletStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn find_wallet_by_owner(&self, owner: &str) -> StoreResult<Option<WalletRecord>> {
        Ok(self
            .wallets
            .read()
            .await
            .values()
            .find(|w| w.owner == owner)
            .cloned())
    }

    async fn get_wallet(&self, id: &str) -> StoreResult<Option<WalletRecord>> {
        Ok(self.wallets.read().await.get(id).cloned())
    }

    async fn insert_wallet(&self, wallet: NewWallet) -> StoreResult<WalletRecord> {
        // Uniqueness is checked under the same write lock as the insert.
        let mut wallets = self.wallets.write().await;
        if wallets.values().any(|w| w.owner == wallet.owner) {
            return Err(StoreError::Conflict(format!(
                "Identity {} already has a wallet",
                wallet.owner
            )));
        }
        let now = now_string();
        let record = WalletRecord {
            id: new_record_id(),
            owner: wallet.owner,
            encrypted_jwk: wallet.encrypted_jwk,
            salt: wallet.salt,
            public_key: wallet.public_key,
            address: wallet.address,
            created: now.clone(),
            updated: now,
        };
        wallets.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn list_connected_wallets(&self, owner: &str) -> StoreResult<Vec<ConnectedWallet>> {
        let mut list: Vec<ConnectedWallet> = self
            .connected
            .read()
            .await
            .values()
            .filter(|w| w.owner == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(list)
    }

    async fn insert_connected_wallet(
        &self,
        wallet: NewConnectedWallet,
    ) -> StoreResult<ConnectedWallet> {
        let mut connected = self.connected.write().await;
        if connected
            .values()
            .any(|w| w.owner == wallet.owner && w.address == wallet.address)
        {
            return Err(StoreError::Conflict(format!(
                "Wallet {} is already connected",
                wallet.address
            )));
        }
        let record = ConnectedWallet {
            id: new_record_id(),
            owner: wallet.owner,
            address: wallet.address,
            public_key: wallet.public_key,
            signature: wallet.signature,
            created: now_string(),
        };
        connected.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_connected_wallet(&self, owner: &str, id: &str) -> StoreResult<bool> {
        let mut connected = self.connected.write().await;
        match connected.get(id) {
            Some(wallet) if wallet.owner == owner => {
                connected.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
