//! WalletSession backed by the WAuth HTTP API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::provider::Provider;
use super::session::{Authenticator, CredentialSource, OAuthGrant, WalletSession};
use super::storage::{SharedClientStorage, PERSISTED_SESSION_KEY};
use super::types::{AuthData, Connection, GatewayConfig, PermissionType};
use crate::api::{ErrorResponse, PublicWallet};
use crate::error::{Result, WAuthError};
use crate::registry::AddConnectedWalletRequest;
use crate::store::ConnectedWallet;
use crate::util::short_address;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Session blob kept under [`PERSISTED_SESSION_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    #[serde(default)]
    meta: AuthData,
}

struct ActiveSession {
    token: String,
    meta: AuthData,
    wallet: PublicWallet,
}

impl ActiveSession {
    fn connection(&self) -> Connection {
        Connection {
            meta: self.meta.clone(),
            address: self.wallet.address.clone(),
            public_key: self.wallet.public_key.clone(),
        }
    }
}

/// HTTP client session.
///
/// On connect it runs the [`Authenticator`], fetches the caller's wallet and,
/// if there is none yet, creates it with credentials from the
/// [`CredentialSource`]. The bearer token is persisted to client storage so
/// [`WalletSession::restore`] can resume without user interaction.
pub struct HttpWalletSession {
    client: Client,
    base_url: String,
    authenticator: Arc<dyn Authenticator>,
    credentials: Arc<dyn CredentialSource>,
    storage: SharedClientStorage,
    gateway: GatewayConfig,
    state: RwLock<Option<ActiveSession>>,
}

impl HttpWalletSession {
    /// `base_url` is the server root, e.g. `http://localhost:8090`.
    pub fn new(
        base_url: &str,
        authenticator: Arc<dyn Authenticator>,
        credentials: Arc<dyn CredentialSource>,
        storage: SharedClientStorage,
    ) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| WAuthError::Transport(format!("Invalid base URL {}: {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| WAuthError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            authenticator,
            credentials,
            storage,
            gateway: GatewayConfig::default(),
            state: RwLock::new(None),
        })
    }

    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn token(&self) -> Result<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(WAuthError::NotConnected)
    }

    /// Map a non-success response to the error the server reported.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => err.into_error(),
            Err(_) => WAuthError::Transport(format!("HTTP {}: {}", status, body)),
        })
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                WAuthError::Transport(format!("Request timeout: {}", e))
            } else if e.is_connect() {
                WAuthError::Transport(format!("Connection failed: {}", e))
            } else {
                WAuthError::Transport(format!("Request failed: {}", e))
            }
        })?;
        Self::check(response).await
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = Self::send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| WAuthError::Transport(format!("Failed to parse response: {}", e)))
    }

    /// The caller's wallet, created on first use.
    async fn ensure_wallet(&self, token: &str) -> Result<PublicWallet> {
        let existing: Vec<PublicWallet> = Self::send_json(
            self.client
                .get(self.endpoint("/api/wallets"))
                .bearer_auth(token),
        )
        .await?;

        if let Some(wallet) = existing.into_iter().next() {
            return Ok(wallet);
        }

        let credentials = self.credentials.encrypted_credentials().await?;
        let request = self
            .client
            .post(self.endpoint("/api/wallets"))
            .bearer_auth(token);
        let wallet: PublicWallet = Self::send_json(credentials.apply(request)).await?;
        tracing::info!(address = %short_address(&wallet.address), "Created WAuth wallet");
        Ok(wallet)
    }

    fn persist(&self, token: &str, meta: &AuthData) {
        let blob = PersistedSession {
            token: token.to_string(),
            meta: meta.clone(),
        };
        let result = serde_json::to_string(&blob)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            .and_then(|json| self.storage.set(PERSISTED_SESSION_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist WAuth session: {}", e);
        }
    }

    async fn activate(&self, grant: OAuthGrant) -> Result<Connection> {
        let wallet = self.ensure_wallet(&grant.token).await?;
        self.persist(&grant.token, &grant.meta);

        let session = ActiveSession {
            token: grant.token,
            meta: grant.meta,
            wallet,
        };
        let connection = session.connection();
        *self.state.write().await = Some(session);
        Ok(connection)
    }
}

#[async_trait]
impl WalletSession for HttpWalletSession {
    async fn connect(&self, provider: Provider) -> Result<Connection> {
        let grant = self.authenticator.authenticate(provider).await?;
        tracing::debug!(provider = %provider, "OAuth flow completed");
        self.activate(grant).await
    }

    async fn restore(&self) -> Result<Option<Connection>> {
        let Some(raw) = self.storage.get(PERSISTED_SESSION_KEY) else {
            return Ok(None);
        };
        let persisted: PersistedSession = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Discarding unreadable persisted session: {}", e);
                return Ok(None);
            }
        };

        match self
            .activate(OAuthGrant {
                token: persisted.token,
                meta: persisted.meta,
            })
            .await
        {
            Ok(connection) => Ok(Some(connection)),
            Err(WAuthError::Unauthorized(reason)) => {
                tracing::debug!("Persisted session rejected: {}", reason);
                if let Err(e) = self.storage.remove(PERSISTED_SESSION_KEY) {
                    tracing::warn!("Failed to clear persisted session: {}", e);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn logout(&self) {
        *self.state.write().await = None;
        if let Err(e) = self.storage.remove(PERSISTED_SESSION_KEY) {
            tracing::warn!("Failed to clear persisted session: {}", e);
        }
    }

    async fn get_auth_data(&self) -> Option<AuthData> {
        self.state.read().await.as_ref().map(|s| s.meta.clone())
    }

    async fn get_active_address(&self) -> Result<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.wallet.address.clone())
            .ok_or(WAuthError::NotConnected)
    }

    async fn get_active_public_key(&self) -> Result<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.wallet.public_key.clone())
            .ok_or(WAuthError::NotConnected)
    }

    async fn get_permissions(&self) -> Result<Vec<PermissionType>> {
        if self.state.read().await.is_none() {
            return Ok(Vec::new());
        }
        Ok(vec![
            PermissionType::AccessAddress,
            PermissionType::AccessPublicKey,
            PermissionType::AccessAllAddresses,
            PermissionType::AccessArweaveConfig,
        ])
    }

    async fn get_wallet_names(&self) -> Result<HashMap<String, String>> {
        let address = self.get_active_address().await?;
        Ok(HashMap::from([(address, "WAuth".to_string())]))
    }

    async fn get_arweave_config(&self) -> Result<GatewayConfig> {
        Ok(self.gateway.clone())
    }

    async fn get_connected_wallets(&self) -> Result<Vec<ConnectedWallet>> {
        let token = self.token().await?;
        Self::send_json(
            self.client
                .get(self.endpoint("/api/connected-wallets"))
                .bearer_auth(token),
        )
        .await
    }

    async fn add_connected_wallet(
        &self,
        request: AddConnectedWalletRequest,
    ) -> Result<ConnectedWallet> {
        let token = self.token().await?;
        Self::send_json(
            self.client
                .post(self.endpoint("/api/connected-wallets"))
                .bearer_auth(token)
                .json(&request),
        )
        .await
    }

    async fn remove_connected_wallet(&self, id: &str) -> Result<()> {
        let token = self.token().await?;
        let path = format!("/api/connected-wallets/{}", urlencoding::encode(id));
        Self::send(self.client.delete(self.endpoint(&path)).bearer_auth(token)).await?;
        Ok(())
    }
}
