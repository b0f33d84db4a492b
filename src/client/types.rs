//! Client-side wallet capability types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OAuth metadata for the active session, handed to auth-data listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Provider-specific fields passed through untouched
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A resolved session: auth metadata plus the custodied wallet's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub meta: AuthData,
    pub address: String,
    pub public_key: String,
}

/// Arweave wallet permission names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    AccessAddress,
    AccessPublicKey,
    AccessAllAddresses,
    SignTransaction,
    Encrypt,
    Decrypt,
    Signature,
    AccessArweaveConfig,
    Dispatch,
}

/// Gateway the wallet talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "arweave.net".to_string(),
            port: 443,
            protocol: "https".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// ANS-104 data item parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_data_keeps_unknown_fields() {
        let json = r#"{"accessToken":"tok","email":"a@b.c","avatar":"https://x/y.png"}"#;
        let data: AuthData = serde_json::from_str(json).unwrap();
        assert_eq!(data.access_token.as_deref(), Some("tok"));
        assert_eq!(data.email.as_deref(), Some("a@b.c"));
        assert_eq!(data.extra["avatar"], "https://x/y.png");
    }

    #[test]
    fn permissions_use_wallet_names() {
        let json = serde_json::to_string(&PermissionType::AccessPublicKey).unwrap();
        assert_eq!(json, r#""ACCESS_PUBLIC_KEY""#);
    }
}
