//! The authenticated session a strategy drives.
//!
//! [`WalletSession`] is the boundary between the per-provider strategy and
//! whatever actually talks to the WAuth backend. [`super::HttpWalletSession`]
//! is the HTTP implementation; tests substitute in-process fakes.

use std::collections::HashMap;

use async_trait::async_trait;

use super::provider::Provider;
use super::types::{AuthData, Connection, GatewayConfig, PermissionType};
use crate::error::Result;
use crate::provisioning::EncryptedCredentials;
use crate::registry::AddConnectedWalletRequest;
use crate::store::ConnectedWallet;

/// Session operations used by [`super::WAuthStrategy`].
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Session library version, reported as the wallet version.
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// Authenticate with `provider` and make sure the custodied wallet exists.
    async fn connect(&self, provider: Provider) -> Result<Connection>;

    /// Resume a persisted session without user interaction, if one exists.
    async fn restore(&self) -> Result<Option<Connection>> {
        Ok(None)
    }

    /// Drop the session. Never fails.
    async fn logout(&self);

    async fn get_auth_data(&self) -> Option<AuthData>;

    async fn get_active_address(&self) -> Result<String>;
    async fn get_active_public_key(&self) -> Result<String>;
    async fn get_permissions(&self) -> Result<Vec<PermissionType>>;
    async fn get_wallet_names(&self) -> Result<HashMap<String, String>>;
    async fn get_arweave_config(&self) -> Result<GatewayConfig>;

    async fn get_connected_wallets(&self) -> Result<Vec<ConnectedWallet>>;
    async fn add_connected_wallet(
        &self,
        request: AddConnectedWalletRequest,
    ) -> Result<ConnectedWallet>;
    async fn remove_connected_wallet(&self, id: &str) -> Result<()>;
}

/// Result of an OAuth flow: a bearer token for the WAuth API plus the
/// provider's user metadata.
#[derive(Debug, Clone)]
pub struct OAuthGrant {
    pub token: String,
    pub meta: AuthData,
}

/// Runs the provider's OAuth flow (popup, device code, pre-issued token…).
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, provider: Provider) -> Result<OAuthGrant>;
}

/// Supplies the encrypted password pair used the first time a wallet is
/// created for an identity.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn encrypted_credentials(&self) -> Result<EncryptedCredentials>;
}

/// A fixed credential pair.
#[async_trait]
impl CredentialSource for EncryptedCredentials {
    async fn encrypted_credentials(&self) -> Result<EncryptedCredentials> {
        Ok(self.clone())
    }
}
