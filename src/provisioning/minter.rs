//! Client for the external key-minting service.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::credentials::EncryptedCredentials;
use crate::config::KeyServiceConfig;
use crate::error::{Result, WAuthError};

/// Key material returned by the minting service.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct MintedKey {
    #[serde(rename = "encryptedJWK")]
    pub encrypted_jwk: String,
    pub salt: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub address: String,
}

impl std::fmt::Debug for MintedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintedKey")
            .field("encrypted_jwk", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish()
    }
}

/// Exchanges encrypted credentials for a freshly minted key.
#[async_trait]
pub trait KeyMinter: Send + Sync {
    async fn mint(&self, credentials: &EncryptedCredentials) -> Result<MintedKey>;
}

/// HTTP implementation talking to the key-minting service.
#[derive(Clone)]
pub struct HttpKeyMinter {
    url: url::Url,
    client: reqwest::Client,
}

impl HttpKeyMinter {
    pub fn new(config: &KeyServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WAuthError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait]
impl KeyMinter for HttpKeyMinter {
    async fn mint(&self, credentials: &EncryptedCredentials) -> Result<MintedKey> {
        let request = credentials.apply(self.client.get(self.url.clone()));

        let resp = request.send().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "Key service unreachable");
            WAuthError::ProvisioningUpstream {
                status: None,
                body: e.to_string(),
            }
        })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "Key service rejected credential exchange");
            return Err(WAuthError::ProvisioningUpstream {
                status: Some(status.as_u16()),
                body: text,
            });
        }

        let minted: MintedKey =
            serde_json::from_str(&text).map_err(|e| WAuthError::ProvisioningUpstream {
                status: Some(status.as_u16()),
                body: format!("Failed to parse key service response: {}", e),
            })?;
        debug!(address = %minted.address, "Key service minted a new wallet");
        Ok(minted)
    }
}
