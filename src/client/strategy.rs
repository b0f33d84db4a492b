//! Per-provider wallet strategy.
//!
//! A [`WAuthStrategy`] presents one OAuth provider as an Arweave wallet:
//! it owns the connection state, fans auth-data and address changes out to
//! listeners, and forwards connected-wallet operations to the session.
//! Signing and encryption are not offered by WAuth and always fail with
//! [`WAuthError::NotImplemented`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::listeners::{ListenerSet, Subscription};
use super::provider::Provider;
use super::session::WalletSession;
use super::storage::{SharedClientStorage, STRATEGY_ID_KEY};
use super::types::{AuthData, Connection, DataItem, DispatchResult, GatewayConfig, PermissionType};
use crate::error::{Result, WAuthError};
use crate::registry::{build_add_request, ExternalWallet};
use crate::store::ConnectedWallet;
use crate::util::short_address;

pub const STRATEGY_THEME: &str = "25,25,25";
pub const STRATEGY_URL: &str = "https://subspace.ar.io";
pub const WALLET_NAME: &str = "WAuth";

/// Display metadata for the wallet picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub theme: String,
    pub logo: String,
    pub url: String,
}

impl StrategyInfo {
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            id: provider.strategy_id(),
            name: provider.display_name().to_string(),
            description: format!("Sign in to {} with {}", WALLET_NAME, provider.display_name()),
            theme: STRATEGY_THEME.to_string(),
            logo: provider.logo().to_string(),
            url: STRATEGY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(Connection),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

pub struct WAuthStrategy {
    provider: Provider,
    info: StrategyInfo,
    session: Arc<dyn WalletSession>,
    storage: SharedClientStorage,
    state: RwLock<ConnectionState>,
    auth_listeners: ListenerSet<AuthData>,
    address_listeners: ListenerSet<String>,
}

impl WAuthStrategy {
    pub fn new(
        provider: Provider,
        session: Arc<dyn WalletSession>,
        storage: SharedClientStorage,
    ) -> Self {
        Self {
            provider,
            info: StrategyInfo::for_provider(provider),
            session,
            storage,
            state: RwLock::new(ConnectionState::Disconnected),
            auth_listeners: ListenerSet::new(),
            address_listeners: ListenerSet::new(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn info(&self) -> &StrategyInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn storage(&self) -> &SharedClientStorage {
        &self.storage
    }

    pub fn wallet_version(&self) -> &str {
        self.session.version()
    }

    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.is_connected()
    }

    /// Connect through the provider's OAuth flow. Custom permissions are not
    /// supported and are ignored.
    pub async fn connect(&self, permissions: &[PermissionType]) -> Result<()> {
        if !permissions.is_empty() {
            warn!(
                strategy = %self.info.id,
                ?permissions,
                "WAuth does not support custom permissions"
            );
        }
        self.establish(false).await.map(|_| ())
    }

    /// Connect again, resuming a persisted session when possible, and return
    /// the resulting auth metadata.
    pub async fn reconnect(&self) -> Result<AuthData> {
        self.establish(true).await
    }

    async fn establish(&self, resume: bool) -> Result<AuthData> {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, ConnectionState::Connecting)
        };

        let result = if resume {
            match self.session.restore().await {
                Ok(Some(connection)) => Ok(connection),
                Ok(None) => self.session.connect(self.provider).await,
                Err(e) => {
                    debug!("Session restore failed, running OAuth flow: {}", e);
                    self.session.connect(self.provider).await
                }
            }
        } else {
            self.session.connect(self.provider).await
        };

        let connection = match result {
            Ok(connection) => connection,
            Err(e) => {
                *self.state.write().await = previous;
                warn!(strategy = %self.info.id, "Connect failed: {}", e);
                return Err(e);
            }
        };

        let meta = connection.meta.clone();
        let address = connection.address.clone();
        *self.state.write().await = ConnectionState::Connected(connection);

        if let Err(e) = self.storage.set(STRATEGY_ID_KEY, &self.info.id) {
            warn!("Failed to persist active strategy: {}", e);
        }
        info!(
            strategy = %self.info.id,
            address = %short_address(&address),
            "Connected"
        );

        self.auth_listeners.notify(&meta);
        self.address_listeners.notify(&address);
        Ok(meta)
    }

    /// Log out and forget local auth metadata.
    pub async fn disconnect(&self) {
        self.session.logout().await;
        *self.state.write().await = ConnectionState::Disconnected;

        if self.storage.get(STRATEGY_ID_KEY).as_deref() == Some(self.info.id.as_str()) {
            if let Err(e) = self.storage.remove(STRATEGY_ID_KEY) {
                warn!("Failed to clear active strategy: {}", e);
            }
        }
        info!(strategy = %self.info.id, "Disconnected");
    }

    /// Register an auth-data listener. Dropping the handle unregisters it.
    pub fn on_auth_data_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthData) + Send + Sync + 'static,
    {
        self.auth_listeners.subscribe(listener)
    }

    pub async fn get_auth_data(&self) -> Option<AuthData> {
        self.session.get_auth_data().await
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.state.read().await.is_connected() {
            Ok(())
        } else {
            Err(WAuthError::NotConnected)
        }
    }

    pub async fn get_active_address(&self) -> Result<String> {
        self.ensure_connected().await?;
        self.session.get_active_address().await
    }

    pub async fn get_all_addresses(&self) -> Result<Vec<String>> {
        Ok(vec![self.get_active_address().await?])
    }

    pub async fn get_active_public_key(&self) -> Result<String> {
        self.ensure_connected().await?;
        self.session.get_active_public_key().await
    }

    pub async fn get_permissions(&self) -> Result<Vec<PermissionType>> {
        self.session.get_permissions().await
    }

    pub async fn get_wallet_names(&self) -> Result<HashMap<String, String>> {
        self.session.get_wallet_names().await
    }

    pub async fn get_arweave_config(&self) -> Result<GatewayConfig> {
        self.session.get_arweave_config().await
    }

    pub async fn is_available(&self) -> bool {
        true
    }

    /// Register an address listener, called with the wallet address on
    /// every successful connect.
    pub fn add_address_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.address_listeners.subscribe(listener)
    }

    pub fn remove_address_event(&self, subscription: Subscription) {
        subscription.unsubscribe();
    }

    pub async fn sign(&self, _transaction: &serde_json::Value) -> Result<serde_json::Value> {
        Err(WAuthError::NotImplemented("Sign"))
    }

    pub async fn dispatch(&self, _transaction: &serde_json::Value) -> Result<DispatchResult> {
        Err(WAuthError::NotImplemented("Dispatch"))
    }

    pub async fn sign_data_item(&self, _item: &DataItem) -> Result<Vec<u8>> {
        Err(WAuthError::NotImplemented("Sign data item"))
    }

    pub async fn encrypt(&self, _data: &[u8], _options: &serde_json::Value) -> Result<Vec<u8>> {
        Err(WAuthError::NotImplemented("Encrypt"))
    }

    pub async fn decrypt(&self, _data: &[u8], _options: &serde_json::Value) -> Result<Vec<u8>> {
        Err(WAuthError::NotImplemented("Decrypt"))
    }

    pub async fn get_connected_wallets(&self) -> Result<Vec<ConnectedWallet>> {
        self.session.get_connected_wallets().await
    }

    /// Prove ownership of `wallet` and link it to the signed-in identity.
    pub async fn add_connected_wallet(&self, wallet: &dyn ExternalWallet) -> Result<ConnectedWallet> {
        let request = build_add_request(wallet).await?;
        let linked = self.session.add_connected_wallet(request).await?;
        info!(address = %short_address(&linked.address), "Linked external wallet");
        Ok(linked)
    }

    pub async fn remove_connected_wallet(&self, id: &str) -> Result<()> {
        self.session.remove_connected_wallet(id).await
    }
}
